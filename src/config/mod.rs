//! Configuration Module
//!
//! 提供应用配置管理功能，支持多层级配置来源：
//! - 环境变量（最高优先级）
//! - 配置文件（JSON 或 TOML 格式）
//! - 默认值（最低优先级）

mod loader;
mod types;

pub use loader::{load_blocked_ips, load_config, load_config_from_path, print_config, ConfigError};
pub use types::{
    ApiConfig, AppConfig, LimitsConfig, LogConfig, LogSwitches, SecurityConfig, ServerConfig,
    StaticFilesConfig, TextToVideoConfig, TosConfig, VideoComprehensionConfig,
};
