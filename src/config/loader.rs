//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.json / config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径（扩展名由 config crate 自动识别）
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// # 环境变量示例
/// - `WORKBENCH_SERVER__PORT=8080`
/// - `WORKBENCH_TOS__BUCKET_NAME=media`
/// - `WORKBENCH_TEXT_TO_VIDEO__ARK_API_KEY=...`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "localhost")?
        .set_default("server.port", 8001)?
        .set_default("limits.max_file_size_mb", 10)?
        .set_default("limits.max_images", 4)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 前缀: WORKBENCH_，层级分隔符: __
    builder = builder.add_source(
        Environment::with_prefix("WORKBENCH")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.limits.max_file_size_mb == 0 || config.limits.max_video_size_mb == 0 {
        return Err(ConfigError::ValidationError(
            "Upload size limits must be greater than 0".to_string(),
        ));
    }

    if config.limits.max_images == 0 {
        return Err(ConfigError::ValidationError(
            "max_images must be greater than 0".to_string(),
        ));
    }

    if config.tos.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tosutil timeout cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 加载 IP 黑名单
///
/// 文件不存在时返回空集合；读取失败只记录警告。
pub fn load_blocked_ips(path: &Path) -> HashSet<String> {
    if !path.exists() {
        return HashSet::new();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => parse_block_list(&content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to load IP block list");
            HashSet::new()
        }
    }
}

fn parse_block_list(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// 打印配置信息（用于启动时日志），不输出任何密钥
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Workbench Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!(
        "Static files: {} ({:?})",
        config.server.static_files.enabled,
        config.server.static_files.dir
    );
    tracing::info!("TOS: bucket={} region={}", config.tos.bucket_name, config.tos.region);
    tracing::info!("tosutil: {:?}", config.tos.tosutil_path);
    tracing::info!("Reference I2V endpoint: {}", config.api.endpoint);
    tracing::info!("Text-to-video endpoint: {}", config.text_to_video.endpoint);
    tracing::info!(
        "Video comprehension endpoint: {} (model {})",
        config.video_comprehension.endpoint,
        config.video_comprehension.model
    );
    tracing::info!(
        "Limits: max_file_size={}MB max_images={} max_video_size={}MB",
        config.limits.max_file_size_mb,
        config.limits.max_images,
        config.limits.max_video_size_mb
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("===============================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_images() {
        let mut config = AppConfig::default();
        config.limits.max_images = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_json_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "server": {{"host": "0.0.0.0", "port": 9000}},
                "tos": {{"bucket_name": "media", "region": "cn-shanghai"}},
                "text_to_video": {{"ark_api_key": "k-123"}},
                "logging": {{"text_to_video": {{"enable_request_log": false}}}}
            }}"#
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.tos.region, "cn-shanghai");
        assert_eq!(config.text_to_video.ark_api_key, "k-123");
        assert!(!config.log_switches("text_to_video").enable_request_log);
        assert!(config.log_switches("video_comprehension").enable_request_log);
    }

    #[test]
    fn test_parse_block_list_skips_blank_lines() {
        let ips = parse_block_list("10.0.0.1\n\n  192.168.1.7  \n");
        assert_eq!(ips.len(), 2);
        assert!(ips.contains("192.168.1.7"));
    }

    #[test]
    fn test_missing_block_list_is_empty() {
        let ips = load_blocked_ips(Path::new("/nonexistent/block_list.txt"));
        assert!(ips.is_empty());
    }
}
