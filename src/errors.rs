// 错误类型模块
// 区分网络、表单校验、令牌解码和本地存储几类错误

use thiserror::Error;

/// 远程 API 调用错误
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401/403，本地令牌已被清除
    #[error("Sesión expirada o sin permisos, vuelve a iniciar sesión")]
    Unauthorized,

    #[error("No se puede eliminar la categoría porque hay tutoriales o ejercicios asociados.")]
    CategoryInUse,

    #[error("Recurso no encontrado: {0}")]
    NotFound(String),

    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to parse API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// 是否需要跳转到登录页
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// 表单校验错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("El campo '{0}' es obligatorio")]
    Required(&'static str),

    #[error("Debe haber al menos una respuesta incorrecta")]
    NoIncorrectAnswers,

    #[error("No puede haber más de {max} respuestas incorrectas")]
    TooManyIncorrectAnswers { max: usize },

    #[error("No puedes añadir más de 4 imágenes.")]
    TooManyImages,

    #[error("Imagen no válida: {0}")]
    InvalidImage(String),

    #[error("Nivel de dificultad desconocido: {0}")]
    InvalidLevel(u8),

    #[error("Tipo de categoría desconocido: {0}")]
    InvalidCategoryType(String),
}

/// 令牌解码错误
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    Expired,

    #[error("Token payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Token payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 本地会话存储错误
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}
