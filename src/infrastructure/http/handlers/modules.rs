//! Modules Handler

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use super::super::dto::ModulesResponse;
use super::super::state::AppState;

/// GET /api/modules
///
/// 模块名、描述与路由列表，不包含任何配置项
pub async fn list_modules(State(state): State<Arc<AppState>>) -> Json<ModulesResponse> {
    Json(ModulesResponse::new(state.manager.modules_info()))
}
