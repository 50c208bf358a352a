//! Data Transfer Objects

use std::collections::BTreeMap;

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::application::{ModuleInfo, ModuleResponse};

/// GET /api/modules
#[derive(Debug, Serialize)]
pub struct ModulesResponse {
    pub success: bool,
    pub modules: BTreeMap<String, ModuleInfo>,
}

impl ModulesResponse {
    pub fn new(infos: Vec<ModuleInfo>) -> Self {
        Self {
            success: true,
            modules: infos
                .into_iter()
                .map(|info| (info.name.clone(), info))
                .collect(),
        }
    }
}

/// GET /api/ping
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub success: bool,
    pub status: &'static str,
    pub version: &'static str,
    pub modules: usize,
}

impl IntoResponse for ModuleResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
