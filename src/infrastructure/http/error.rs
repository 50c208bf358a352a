//! HTTP Error Handling
//!
//! 服务器自身产生的错误响应（目前只有黑名单拦截），
//! 与模块响应保持同样的 `{"success": false, "error": ...}` 格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    Forbidden(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Forbidden(msg) => {
                tracing::warn!(error = %msg, "Request forbidden");
                msg
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
