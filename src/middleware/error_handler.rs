use std::any::Any;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::utils::{error_codes, error_to_api_response};

/// 错误响应体最多读取的字节数
const ERROR_BODY_LIMIT: usize = 4096;

pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, ERROR_BODY_LIMIT).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    error!(
        "{} {} failed - Status: {}, Body: {}",
        method,
        path,
        parts.status,
        String::from_utf8_lossy(&bytes)
    );

    // 重置body以便重新构建响应
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}

/// 处理函数 panic 时的兜底响应，只提供回到登录页的恢复路径
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Request handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_to_api_response::<()>(
            error_codes::INTERNAL_ERROR,
            "unexpected failure, please return to the start page and sign in again".into(),
        ),
    )
        .into_response()
}

/// 未知路径
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        error_to_api_response::<()>(
            error_codes::NOT_FOUND,
            "no such page, return to the start page".into(),
        ),
    )
        .into_response()
}
