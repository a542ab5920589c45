// 测试辅助：进程内的模拟 API 服务

use axum::Router;
use std::time::Duration;

use crate::services::api::ApiClient;
use crate::services::session::SessionStore;

/// 在随机端口上启动模拟服务，返回基础地址
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn client_for(base_url: &str) -> ApiClient {
    let session = SessionStore::in_memory().unwrap();
    ApiClient::new(base_url, Duration::from_secs(5), session).unwrap()
}

/// 构造一个未签名的 JWT，负载按 base64url 编码
pub fn fake_token(user_id: &str, role: &str, exp: Option<i64>) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let mut payload = serde_json::json!({
        "user": {"id": user_id, "username": format!("{}-name", user_id), "role": role}
    });
    if let Some(exp) = exp {
        payload["exp"] = serde_json::json!(exp);
    }
    let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, payload)
}
