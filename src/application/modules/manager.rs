//! Module Manager - 模块注册与请求分发
//!
//! 启动阶段单线程注册所有模块，构建全局路由表；之后通过 `Arc` 共享，
//! 分发只读路由表，无需加锁。

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use http::{HeaderMap, Method};
use thiserror::Error;

use super::module::{Endpoint, Module, ModuleInfo, ModuleRequest, ModuleResponse, Route};

/// 注册错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("route conflict on '{path}': already registered by module '{existing_module}', requested by '{new_module}'")]
    RouteConflict {
        path: String,
        existing_module: String,
        new_module: String,
    },

    #[error("module '{module}' failed to initialize: {reason}")]
    ModuleInit { module: String, reason: String },

    #[error("module '{0}' is already registered")]
    DuplicateModule(String),
}

struct RouteEntry {
    route: Route,
    module: Arc<dyn Module>,
}

/// 模块管理器
#[derive(Default)]
pub struct ModuleManager {
    modules: Vec<Arc<dyn Module>>,
    routes: HashMap<&'static str, RouteEntry>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册模块
    ///
    /// 任一路径冲突时整个模块注册失败，路由表保持不变。
    pub fn register_module(&mut self, module: Arc<dyn Module>) -> Result<(), RegistryError> {
        let name = module.name().to_string();

        if self.modules.iter().any(|m| m.name() == name) {
            return Err(RegistryError::DuplicateModule(name));
        }

        module
            .validate_config()
            .map_err(|reason| RegistryError::ModuleInit {
                module: name.clone(),
                reason,
            })?;

        let routes = module.routes();
        for (index, route) in routes.iter().enumerate() {
            if let Some(existing) = self.routes.get(route.path) {
                return Err(RegistryError::RouteConflict {
                    path: route.path.to_string(),
                    existing_module: existing.module.name().to_string(),
                    new_module: name,
                });
            }
            if routes[..index].iter().any(|r| r.path == route.path) {
                return Err(RegistryError::RouteConflict {
                    path: route.path.to_string(),
                    existing_module: name.clone(),
                    new_module: name,
                });
            }
        }

        for route in routes {
            tracing::info!(route = route.path, module = %name, "Route registered");
            self.routes.insert(
                route.path,
                RouteEntry {
                    route,
                    module: module.clone(),
                },
            );
        }

        tracing::info!(module = %name, "Module registered");
        self.modules.push(module);
        Ok(())
    }

    /// 查找路径对应的模块与处理标签
    ///
    /// 精确匹配优先，其次最长前缀路由。
    pub fn find(&self, path: &str) -> Option<(&Arc<dyn Module>, Endpoint)> {
        if let Some(entry) = self.routes.get(path).filter(|e| !e.route.is_prefix()) {
            return Some((&entry.module, entry.route.endpoint));
        }

        self.routes
            .values()
            .filter(|e| e.route.is_prefix() && e.route.matches(path))
            .max_by_key(|e| e.route.path.len())
            .map(|e| (&e.module, e.route.endpoint))
    }

    /// 分发请求
    ///
    /// 路径未注册时返回 404；否则原样返回模块响应。
    pub async fn dispatch(
        &self,
        path: &str,
        method: Method,
        headers: HeaderMap,
        body: Bytes,
    ) -> ModuleResponse {
        let Some((module, endpoint)) = self.find(path) else {
            return ModuleResponse::not_found(path);
        };

        tracing::debug!(
            path,
            method = %method,
            module = module.name(),
            endpoint = ?endpoint,
            "Dispatching request"
        );

        module
            .handle_request(ModuleRequest {
                endpoint,
                path: path.to_string(),
                method,
                headers,
                body,
            })
            .await
    }

    /// 所有模块信息，按注册顺序
    pub fn modules_info(&self) -> Vec<ModuleInfo> {
        self.modules
            .iter()
            .map(|m| ModuleInfo {
                name: m.name().to_string(),
                description: m.description().to_string(),
                routes: m.routes().iter().map(|r| r.path.to_string()).collect(),
            })
            .collect()
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}
