//! HTTP Middleware
//!
//! - IP 黑名单拦截
//! - 根目录静态资源（.css / .js / .png / .jpg / .ico）
//! - HTTP 状态码错误日志

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower::util::ServiceExt;
use tower_http::services::ServeDir;

use super::error::ApiError;
use super::state::AppState;

/// 客户端 IP（来自连接信息，未启用 ConnectInfo 时为 None）
pub fn client_ip(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// IP 黑名单中间件
///
/// 黑名单中的地址直接返回 403，不进入路由
pub async fn blocked_ip_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(ip) = client_ip(&request) {
        if state.is_blocked(&ip) {
            tracing::warn!(client_ip = %ip, uri = %request.uri(), "Blocked request");
            return ApiError::Forbidden("access denied".to_string()).into_response();
        }
    }

    next.run(request).await
}

/// 按扩展名直接从静态根目录返回的资源
const STATIC_ASSET_EXTENSIONS: [&str; 5] = [".css", ".js", ".png", ".jpg", ".ico"];

pub fn is_static_asset(path: &str) -> bool {
    STATIC_ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// 静态资源中间件
///
/// GET/HEAD 请求的路径以资源扩展名结尾时由 `ServeDir` 处理（文件不存在返回 404），
/// 其余请求继续交给路由。
pub async fn static_asset_middleware(
    State(assets): State<ServeDir>,
    request: Request,
    next: Next,
) -> Response {
    let readable = matches!(*request.method(), Method::GET | Method::HEAD);
    if !readable || !is_static_asset(request.uri().path()) {
        return next.run(request).await;
    }

    match assets.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// HTTP 状态码错误日志中间件
///
/// 拦截 HTTP 响应，当状态码为 4xx 或 5xx 时记录日志
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let ip = client_ip(&request).unwrap_or_default();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            client_ip = %ip,
            status = %status.as_u16(),
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            client_ip = %ip,
            status = %status.as_u16(),
            "HTTP client error"
        );
    }

    response
}
