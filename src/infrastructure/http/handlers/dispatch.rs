//! Module Dispatch Handler
//!
//! 未被静态页面或 /api 路由匹配的请求都交给模块管理器分发

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};

use super::super::state::AppState;
use crate::domain::error_report::extract_upstream;

pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path();
    let response = state.manager.dispatch(path, method, headers, body).await;

    if !response.is_success() {
        let info = extract_upstream(Some(&response.body), "");
        if !info.code.is_empty() || !info.request_id.is_empty() {
            tracing::warn!(
                path,
                status = response.status.as_u16(),
                code = %info.code,
                error_type = %info.error_type,
                request_id = %info.request_id,
                message = %info.message,
                "Upstream error"
            );
        }
    }

    response.into_response()
}
