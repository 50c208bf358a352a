//! Domain Layer - 领域层
//!
//! 包含两个上下文:
//! - Generation Context: 视频生成 / 视频理解请求的构造与模型选择
//! - Error Report Context: 上游错误的归一化与展示

pub mod error_report;
pub mod generation;
