//! Application State
//!
//! 路由表与 IP 黑名单在启动后只读，请求处理期间无需加锁

use std::collections::HashSet;
use std::sync::Arc;

use crate::application::ModuleManager;

/// 应用状态
pub struct AppState {
    pub manager: Arc<ModuleManager>,
    pub blocked_ips: HashSet<String>,
}

impl AppState {
    pub fn new(manager: ModuleManager, blocked_ips: HashSet<String>) -> Self {
        Self {
            manager: Arc::new(manager),
            blocked_ips,
        }
    }

    pub fn is_blocked(&self, ip: &str) -> bool {
        self.blocked_ips.contains(ip)
    }
}
