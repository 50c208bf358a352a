//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// TOS 对象存储配置
    #[serde(default)]
    pub tos: TosConfig,

    /// 参考图生视频模块使用的 API 配置
    #[serde(default)]
    pub api: ApiConfig,

    /// 文生视频 / 首尾帧生视频模块配置
    #[serde(default)]
    pub text_to_video: TextToVideoConfig,

    /// 视频理解模块配置
    #[serde(default)]
    pub video_comprehension: VideoComprehensionConfig,

    /// 上传限制
    #[serde(default)]
    pub limits: LimitsConfig,

    /// 安全配置
    #[serde(default)]
    pub security: SecurityConfig,

    /// 全局日志配置
    #[serde(default)]
    pub log: LogConfig,

    /// 模块级日志开关，key 为模块名
    #[serde(default)]
    pub logging: HashMap<String, LogSwitches>,
}

impl AppConfig {
    /// 获取模块的日志开关，未配置时全部开启
    pub fn log_switches(&self, module: &str) -> LogSwitches {
        self.logging.get(module).cloned().unwrap_or_default()
    }
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 静态文件服务配置
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

/// 静态文件服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    /// 是否启用静态文件服务
    #[serde(default = "default_static_enabled")]
    pub enabled: bool,

    /// 前端文件根目录（index.html、frontend/、static/ 所在目录）
    #[serde(default = "default_static_dir")]
    pub dir: PathBuf,
}

fn default_static_enabled() -> bool {
    true
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: default_static_enabled(),
            dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// TOS 对象存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct TosConfig {
    /// 存储桶名称
    #[serde(default)]
    pub bucket_name: String,

    /// 区域，例如 cn-beijing
    #[serde(default = "default_tos_region")]
    pub region: String,

    /// tosutil 可执行文件路径
    #[serde(default = "default_tosutil_path")]
    pub tosutil_path: PathBuf,

    /// 单次 tosutil 调用超时（秒）
    #[serde(default = "default_tosutil_timeout")]
    pub timeout_secs: u64,
}

fn default_tos_region() -> String {
    "cn-beijing".to_string()
}

fn default_tosutil_path() -> PathBuf {
    PathBuf::from("./tosutil")
}

fn default_tosutil_timeout() -> u64 {
    30
}

impl Default for TosConfig {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            region: default_tos_region(),
            tosutil_path: default_tosutil_path(),
            timeout_secs: default_tosutil_timeout(),
        }
    }
}

impl TosConfig {
    /// 对象公开访问的 Base URL
    pub fn base_url(&self) -> String {
        format!("https://{}.tos-{}.volces.com", self.bucket_name, self.region)
    }
}

/// 视频生成任务 API 配置（参考图生视频模块）
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_tasks_endpoint")]
    pub endpoint: String,

    /// 请求超时（秒）
    #[serde(default = "default_api_timeout")]
    pub timeout: u64,

    /// 为空时使用前端页面传入的 API Key
    #[serde(default)]
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tasks_endpoint(),
            timeout: default_api_timeout(),
            api_key: String::new(),
        }
    }
}

/// 文生视频模块配置
#[derive(Debug, Clone, Deserialize)]
pub struct TextToVideoConfig {
    #[serde(default = "default_tasks_endpoint")]
    pub endpoint: String,

    /// 默认 API Key，页面传入的 key 优先
    #[serde(default)]
    pub ark_api_key: String,

    #[serde(default = "default_api_timeout")]
    pub timeout: u64,
}

impl Default for TextToVideoConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tasks_endpoint(),
            ark_api_key: String::new(),
            timeout: default_api_timeout(),
        }
    }
}

/// 视频理解模块配置
#[derive(Debug, Clone, Deserialize)]
pub struct VideoComprehensionConfig {
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,

    /// 配置后优先于页面传入的 key
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_comprehension_timeout")]
    pub timeout: u64,

    #[serde(default = "default_vision_model")]
    pub model: String,
}

impl Default for VideoComprehensionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            api_key: String::new(),
            timeout: default_comprehension_timeout(),
            model: default_vision_model(),
        }
    }
}

fn default_tasks_endpoint() -> String {
    "https://ark.cn-beijing.volces.com/api/v3/contents/generations/tasks".to_string()
}

fn default_chat_endpoint() -> String {
    "https://ark.cn-beijing.volces.com/api/v3/chat/completions".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

fn default_comprehension_timeout() -> u64 {
    60
}

fn default_vision_model() -> String {
    "doubao-seed-1-6-vision-250815".to_string()
}

/// 上传限制
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// 单张图片最大大小（MB）
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// 参考图最大数量
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// 单个视频最大大小（MB）
    #[serde(default = "default_max_video_size_mb")]
    pub max_video_size_mb: u64,
}

fn default_max_file_size_mb() -> u64 {
    10
}

fn default_max_images() -> usize {
    4
}

fn default_max_video_size_mb() -> u64 {
    100
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            max_images: default_max_images(),
            max_video_size_mb: default_max_video_size_mb(),
        }
    }
}

impl LimitsConfig {
    pub fn max_file_size_bytes(&self) -> usize {
        mb_to_bytes(self.max_file_size_mb)
    }

    pub fn max_video_size_bytes(&self) -> usize {
        mb_to_bytes(self.max_video_size_mb)
    }

    /// 请求体上限：取视频与图片上限中较大者，并为多张图片和表单字段留余量
    pub fn body_limit_bytes(&self) -> usize {
        let images = self.max_file_size_bytes().saturating_mul(self.max_images.max(1));
        self.max_video_size_bytes()
            .max(images)
            .saturating_add(1024 * 1024)
    }
}

/// 超出 usize 时饱和为 usize::MAX
fn mb_to_bytes(mb: u64) -> usize {
    usize::try_from(mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
}

/// 安全配置
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// IP 黑名单文件，每行一个地址
    #[serde(default = "default_block_list_path")]
    pub block_list_path: PathBuf,
}

fn default_block_list_path() -> PathBuf {
    PathBuf::from("block_list.txt")
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            block_list_path: default_block_list_path(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// 模块级日志开关
///
/// 对应配置 `logging.<module>.enable_*`，缺省全部开启。
#[derive(Debug, Clone, Deserialize)]
pub struct LogSwitches {
    #[serde(default = "enabled")]
    pub enable_request_log: bool,

    #[serde(default = "enabled")]
    pub enable_api_request_log: bool,

    #[serde(default = "enabled")]
    pub enable_api_response_log: bool,

    #[serde(default = "enabled")]
    pub enable_upload_log: bool,

    #[serde(default = "enabled")]
    pub enable_error_traceback: bool,

    #[serde(default = "enabled")]
    pub enable_initialization_log: bool,
}

fn enabled() -> bool {
    true
}

impl Default for LogSwitches {
    fn default() -> Self {
        Self {
            enable_request_log: true,
            enable_api_request_log: true,
            enable_api_response_log: true,
            enable_upload_log: true,
            enable_error_traceback: true,
            enable_initialization_log: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 8001);
        assert_eq!(config.limits.max_images, 4);
        assert_eq!(config.video_comprehension.timeout, 60);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "localhost:8001");
    }

    #[test]
    fn test_tos_base_url() {
        let config = TosConfig {
            bucket_name: "media".to_string(),
            ..TosConfig::default()
        };
        assert_eq!(config.base_url(), "https://media.tos-cn-beijing.volces.com");
    }

    #[test]
    fn test_log_switches_default_to_enabled() {
        let config = AppConfig::default();
        let switches = config.log_switches("text_to_video");
        assert!(switches.enable_request_log);
        assert!(switches.enable_error_traceback);
    }

    #[test]
    fn test_partial_log_switches_deserialize() {
        let switches: LogSwitches =
            serde_json::from_str(r#"{"enable_request_log": false}"#).unwrap();
        assert!(!switches.enable_request_log);
        assert!(switches.enable_upload_log);
    }

    #[test]
    fn test_body_limit_covers_largest_upload() {
        let limits = LimitsConfig::default();
        assert!(limits.body_limit_bytes() > limits.max_video_size_bytes());
        assert!(limits.body_limit_bytes() > limits.max_file_size_bytes() * 4);
    }

    #[test]
    fn test_huge_limits_saturate() {
        let limits = LimitsConfig {
            max_file_size_mb: u64::MAX,
            max_images: usize::MAX,
            max_video_size_mb: u64::MAX / 2,
        };
        assert_eq!(limits.max_file_size_bytes(), usize::MAX);
        assert_eq!(limits.max_video_size_bytes(), usize::MAX);
        assert_eq!(limits.body_limit_bytes(), usize::MAX);
    }
}
