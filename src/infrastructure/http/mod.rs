//! HTTP Layer
//!
//! - /api/*: 健康检查与模块列表
//! - 前端静态页面
//! - 其余路径交给 ModuleManager 按路由表分发

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::HttpServer;
pub use state::AppState;
