//! Workbench - 视频生成与理解工作台
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - generation: 视频生成任务请求体
//! - error_report: 上游错误信息提取与展示
//!
//! 应用层 (application/):
//! - Ports: ArkApiPort, ObjectStoragePort
//! - Modules: 参考图生视频、文生视频、视频理解，以及模块管理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: 路由、中间件、静态页面
//! - Adapters: 方舟 HTTP 客户端、tosutil 对象存储

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
