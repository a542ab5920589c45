//! 认证上下文与路由守卫
//! 令牌只做 base64url 解码读取 `user` 声明，不校验签名，签名由服务端负责

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::errors::AuthError;
use crate::models::{TokenClaims, TokenResponse, User};
use crate::services::api::ApiClient;

/// 解码令牌负载
pub fn decode_token(token: &str) -> Result<TokenClaims, AuthError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::InvalidToken(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }
    if parts[1].is_empty() {
        return Err(AuthError::InvalidToken("empty payload segment".to_string()));
    }

    let payload = URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('='))?;
    Ok(serde_json::from_slice(&payload)?)
}

/// 解码并检查过期时间
pub fn user_from_token(token: &str, now: DateTime<Utc>) -> Result<User, AuthError> {
    let claims = decode_token(token)?;
    if let Some(exp) = claims.exp {
        if exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }
    }
    Ok(claims.user)
}

/// 当前登录状态
pub struct AuthContext {
    api: ApiClient,
    user: Option<User>,
}

impl AuthContext {
    /// 从本地存储恢复登录状态
    pub fn restore(api: ApiClient) -> Self {
        let mut ctx = Self { api, user: None };
        ctx.sync();
        ctx
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// 重新读取本地令牌，401/403 清除令牌后调用
    pub fn sync(&mut self) {
        self.user = match self.api.session().get_token() {
            Ok(Some(token)) => match user_from_token(&token, Utc::now()) {
                Ok(user) => Some(user),
                Err(e) => {
                    log::warn!("Invalid token: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to read stored token: {}", e);
                None
            }
        };
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<&User, AuthError> {
        let response = self.api.login(username, password).await.map_err(|e| {
            log::error!("Error during login: {}", e);
            e
        })?;
        self.adopt(response)
    }

    pub async fn register(&mut self, username: &str, password: &str) -> Result<&User, AuthError> {
        let response = self.api.register(username, password).await.map_err(|e| {
            log::error!("Error during registration: {}", e);
            e
        })?;
        self.adopt(response)
    }

    pub async fn login_with_google(&mut self, credential: &str) -> Result<&User, AuthError> {
        let response = self.api.login_with_google(credential).await.map_err(|e| {
            log::error!("Error during Google login: {}", e);
            e
        })?;
        self.adopt(response)
    }

    /// 保存新令牌并解码用户
    fn adopt(&mut self, response: TokenResponse) -> Result<&User, AuthError> {
        let user = user_from_token(&response.token, Utc::now())?;
        self.api.session().set_token(&response.token)?;
        log::info!("User logged in: {}", user.display_name());
        let user = self.user.insert(user);
        Ok(&*user)
    }

    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.api.session().clear_token()?;
        self.user = None;
        Ok(())
    }
}

/// 客户端页面
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Tutorials,
    Exercises,
    ExerciseDetail(String),
    Challenge,
    Categories,
    AddTutorial,
    EditTutorial(String),
    AddExercise,
    EditExercise(String),
    ExercisesOrder,
}

/// 访问级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
    Admin,
}

impl Route {
    pub fn access(&self) -> Access {
        match self {
            Route::Home | Route::Login | Route::Tutorials => Access::Public,
            Route::Exercises | Route::ExerciseDetail(_) | Route::Challenge => Access::Private,
            Route::Categories
            | Route::AddTutorial
            | Route::EditTutorial(_)
            | Route::AddExercise
            | Route::EditExercise(_)
            | Route::ExercisesOrder => Access::Admin,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Tutorials => "/tutorials".to_string(),
            Route::Exercises => "/exercises".to_string(),
            Route::ExerciseDetail(id) => format!("/exercises/{}", id),
            Route::Challenge => "/challenge".to_string(),
            Route::Categories => "/categories".to_string(),
            Route::AddTutorial => "/add-tutorial".to_string(),
            Route::EditTutorial(id) => format!("/edit-tutorial/{}", id),
            Route::AddExercise => "/add-exercise".to_string(),
            Route::EditExercise(id) => format!("/edit-exercise/{}", id),
            Route::ExercisesOrder => "/exercises-order".to_string(),
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            [""] => Some(Route::Home),
            ["login"] => Some(Route::Login),
            ["tutorials"] => Some(Route::Tutorials),
            ["exercises"] => Some(Route::Exercises),
            ["exercises", id] if !id.is_empty() => Some(Route::ExerciseDetail(id.to_string())),
            ["challenge"] => Some(Route::Challenge),
            ["categories"] => Some(Route::Categories),
            ["add-tutorial"] => Some(Route::AddTutorial),
            ["edit-tutorial", id] if !id.is_empty() => Some(Route::EditTutorial(id.to_string())),
            ["add-exercise"] => Some(Route::AddExercise),
            ["edit-exercise", id] if !id.is_empty() => Some(Route::EditExercise(id.to_string())),
            ["exercises-order"] => Some(Route::ExercisesOrder),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// 路由守卫：允许访问返回 Ok，否则返回应跳转的页面
pub fn guard(route: &Route, user: Option<&User>) -> Result<(), Route> {
    match (route.access(), user) {
        (Access::Public, _) => Ok(()),
        (Access::Private, Some(_)) => Ok(()),
        (Access::Private, None) => Err(Route::Login),
        (Access::Admin, Some(user)) if user.is_admin() => Ok(()),
        (Access::Admin, _) => Err(Route::Home),
    }
}
