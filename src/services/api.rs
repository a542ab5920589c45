//! 远程 REST API 客户端
//! 所有请求都带上本地保存的 Bearer 令牌；401/403 时清除令牌

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::errors::ApiError;
use crate::models::{
    CategoryPayload, Category, CategoryProgress, CompleteExerciseRequest, Credentials,
    Difficulty, Exercise, ExerciseCount, ExercisePayload, GoogleCredential, TokenResponse,
    Tutorial, TutorialPayload, UploadResponse,
};
use crate::services::session::SessionStore;

/// API 客户端
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: reqwest::Client,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: SessionStore) -> Result<Self, ApiError> {
        reqwest::Url::parse(base_url).map_err(|e| ApiError::Url(format!("{}: {}", base_url, e)))?;

        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    // ==================== 请求管线 ====================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 构建请求并附加令牌
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let mut builder = self.http_client.request(method, self.url(path));

        if let Some(token) = self.session.get_token()? {
            builder = builder.bearer_auth(token);
        }

        Ok(builder)
    }

    /// 发送请求，统一处理状态码
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder.build()?;
        let label = format!("{} {}", request.method(), request.url().path());
        log::debug!("-> {}", label);

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("{} failed: {}", label, e);
                return Err(ApiError::Network(e));
            }
        };

        let status = response.status();
        log::debug!("<- {} {}", label, status.as_u16());

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            log::warn!("{} returned {}, clearing stored token", label, status.as_u16());
            self.session.clear_token()?;
            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::NOT_FOUND {
            log::error!("{} not found", label);
            return Err(ApiError::NotFound(response.url().path().to_string()));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            log::error!("{} returned {}: {}", label, status.as_u16(), message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(self.request(Method::GET, path)?).await
    }

    /// 写操作不关心响应体
    async fn write<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        self.send(self.request(method, path)?.json(body)).await?;
        Ok(())
    }

    // ==================== 认证 ====================

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let body = Credentials { username, password };
        self.send_json(self.request(Method::POST, "/auth/login")?.json(&body))
            .await
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let body = Credentials { username, password };
        self.send_json(self.request(Method::POST, "/auth/register")?.json(&body))
            .await
    }

    pub async fn login_with_google(&self, credential: &str) -> Result<TokenResponse, ApiError> {
        let body = GoogleCredential { token: credential };
        self.send_json(self.request(Method::POST, "/auth/google")?.json(&body))
            .await
    }

    // ==================== 教程 ====================

    pub async fn list_tutorials(&self) -> Result<Vec<Tutorial>, ApiError> {
        self.get_json("/tutorials").await
    }

    pub async fn get_tutorial(&self, id: &str) -> Result<Tutorial, ApiError> {
        self.get_json(&format!("/tutorials/{}", id)).await
    }

    pub async fn create_tutorial(&self, payload: &TutorialPayload) -> Result<(), ApiError> {
        self.write(Method::POST, "/tutorials", payload).await
    }

    pub async fn update_tutorial(&self, id: &str, payload: &TutorialPayload) -> Result<(), ApiError> {
        self.write(Method::PATCH, &format!("/tutorials/{}", id), payload)
            .await
    }

    pub async fn delete_tutorial(&self, id: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, &format!("/tutorials/{}", id))?)
            .await?;
        Ok(())
    }

    // ==================== 练习 ====================

    pub async fn list_exercises(&self) -> Result<Vec<Exercise>, ApiError> {
        self.get_json("/exercises").await
    }

    pub async fn list_exercises_by_category(&self, category_id: &str) -> Result<Vec<Exercise>, ApiError> {
        let builder = self
            .request(Method::GET, "/exercises")?
            .query(&[("categoryId", category_id)]);
        self.send_json(builder).await
    }

    pub async fn get_exercise(&self, id: &str) -> Result<Exercise, ApiError> {
        self.get_json(&format!("/exercises/{}", id)).await
    }

    /// 每个分类的题目总数
    pub async fn exercise_totals(&self) -> Result<Vec<ExerciseCount>, ApiError> {
        self.get_json("/exercises/total").await
    }

    /// 服务端计算的下一道题，分类做完时为空
    pub async fn next_exercise(&self, category_id: &str) -> Result<Option<Exercise>, ApiError> {
        let response = self
            .send(self.request(Method::GET, &format!("/exercises/next/{}", category_id))?)
            .await?;
        let body = response.text().await?;

        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn random_exercises(&self, difficulty: Difficulty, count: u32) -> Result<Vec<Exercise>, ApiError> {
        let count = count.to_string();
        let builder = self
            .request(Method::GET, "/exercises/random")?
            .query(&[("difficulty", difficulty.as_query()), ("count", count.as_str())]);
        self.send_json(builder).await
    }

    pub async fn create_exercise(&self, payload: &ExercisePayload) -> Result<(), ApiError> {
        self.write(Method::POST, "/exercises", payload).await
    }

    pub async fn update_exercise(&self, id: &str, payload: &ExercisePayload) -> Result<(), ApiError> {
        self.write(Method::PATCH, &format!("/exercises/{}", id), payload)
            .await
    }

    pub async fn delete_exercise(&self, id: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, &format!("/exercises/{}", id))?)
            .await?;
        Ok(())
    }

    // ==================== 分类 ====================

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_json("/categories").await
    }

    pub async fn create_category(&self, payload: &CategoryPayload) -> Result<(), ApiError> {
        self.write(Method::POST, "/categories", payload).await
    }

    pub async fn update_category(&self, id: &str, payload: &CategoryPayload) -> Result<(), ApiError> {
        self.write(Method::PATCH, &format!("/categories/{}", id), payload)
            .await
    }

    /// 分类下还有教程或练习时服务端返回 400
    pub async fn delete_category(&self, id: &str) -> Result<(), ApiError> {
        match self
            .send(self.request(Method::DELETE, &format!("/categories/{}", id))?)
            .await
        {
            Ok(_) => Ok(()),
            Err(ApiError::Status { status: 400, .. }) => Err(ApiError::CategoryInUse),
            Err(e) => Err(e),
        }
    }

    // ==================== 用户进度 ====================

    pub async fn user_progress(&self) -> Result<Vec<CategoryProgress>, ApiError> {
        self.get_json("/users/progress").await
    }

    pub async fn complete_exercise(&self, exercise_id: &str, category_id: &str) -> Result<(), ApiError> {
        let body = CompleteExerciseRequest {
            exercise_id,
            category_id,
        };
        self.write(Method::POST, "/users/complete-exercise", &body)
            .await
    }

    // ==================== 上传 ====================

    /// 以 multipart 字段 `image` 上传图片，返回图片地址
    pub async fn upload_image(&self, path: &Path) -> Result<UploadResponse, ApiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("image", part);

        self.send_json(self.request(Method::POST, "/upload")?.multipart(form))
            .await
    }
}
