//! Ping Handler
//!
//! 健康检查

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use super::super::dto::PingResponse;
use super::super::state::AppState;

/// GET /api/ping
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    Json(PingResponse {
        success: true,
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        modules: state.manager.module_names().len(),
    })
}
