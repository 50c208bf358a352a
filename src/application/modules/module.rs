//! Module Contract - 功能模块能力约定
//!
//! 每个功能模块声明自己的路由表（路径 → [`Endpoint`]），并处理分发给它的请求。
//! 处理失败不会以 `Err` 返回给分发层，而是转换成带 `error` / `upstream_error`
//! 字段的响应，前端可以统一渲染。

use async_trait::async_trait;
use axum::body::Bytes;
use http::{header, HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::application::ports::UpstreamFailure;

/// 所有模块处理函数的标签
///
/// 路由表只保存标签，具体处理由所属模块在 `handle_request` 中匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    // 参考图生视频
    GenerateVideo,
    TaskStatus,
    UploadImage,
    UploadAndCreateTask,
    // 文生视频 / 首尾帧生视频
    TextToVideo,
    ImageToVideoAdvanced,
    VideoTaskStatus,
    UploadVideoImage,
    // 视频理解
    VideoComprehensionGenText,
    UploadVideo,
}

/// 模块声明的一条路由
///
/// 以 `/` 结尾的路径为前缀路由，例如 `/task_status/` 匹配 `/task_status/abc`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub endpoint: Endpoint,
}

impl Route {
    pub const fn new(path: &'static str, endpoint: Endpoint) -> Self {
        Self { path, endpoint }
    }

    pub fn is_prefix(&self) -> bool {
        self.path.ends_with('/')
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.is_prefix() {
            path.starts_with(self.path)
        } else {
            path == self.path
        }
    }
}

/// 分发给模块的请求
#[derive(Debug, Clone)]
pub struct ModuleRequest {
    pub endpoint: Endpoint,
    pub path: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ModuleRequest {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn is_multipart(&self) -> bool {
        self.content_type().contains("multipart/form-data")
    }

    /// `Authorization: Bearer <key>` 中的 key
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
            .filter(|v| !v.is_empty())
    }

    /// 前缀路由之后的路径部分，例如 `/task_status/abc` → `abc`
    pub fn path_param(&self, prefix: &str) -> &str {
        self.path.strip_prefix(prefix).unwrap_or_default()
    }

    pub fn require_method(&self, module: &str, method: Method) -> HandlerResult<()> {
        if self.method == method {
            Ok(())
        } else {
            Err(ModuleResponse::error(
                StatusCode::METHOD_NOT_ALLOWED,
                module,
                format!("only {} is supported", method),
            ))
        }
    }

    pub fn require_multipart(&self, module: &str) -> HandlerResult<()> {
        if self.is_multipart() {
            Ok(())
        } else {
            Err(ModuleResponse::error(
                StatusCode::BAD_REQUEST,
                module,
                "multipart/form-data is required",
            ))
        }
    }
}

/// 模块内部处理结果，`Err` 分支同样是完整的响应
pub type HandlerResult<T = ModuleResponse> = Result<T, ModuleResponse>;

/// 模块响应
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ModuleResponse {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    /// `{"success": false, "error": message, "module": module}`
    pub fn error(status: StatusCode, module: &str, message: impl Into<String>) -> Self {
        Self::json(
            status,
            json!({
                "success": false,
                "error": message.into(),
                "module": module,
            }),
        )
    }

    /// 路由表中没有匹配路径
    pub fn not_found(path: &str) -> Self {
        Self::json(
            StatusCode::NOT_FOUND,
            json!({
                "success": false,
                "error": "path not found",
                "path": path,
            }),
        )
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// 构造携带上游错误的失败响应
///
/// `upstream_error` 为上游返回的错误对象（可能为 null），
/// `error_response_content` 为上游原始响应文本，`extra` 中的字段合并到顶层。
#[derive(Debug, Clone)]
pub struct ErrorResponseBuilder<'a> {
    module: &'a str,
    status: StatusCode,
    message: String,
    upstream_error: Option<Value>,
    raw: Option<String>,
    extra: Map<String, Value>,
}

impl<'a> ErrorResponseBuilder<'a> {
    pub fn new(module: &'a str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            module,
            status,
            message: message.into(),
            upstream_error: None,
            raw: None,
            extra: Map::new(),
        }
    }

    /// 从上游失败中填充 `upstream_error` 与 `error_response_content`
    pub fn upstream(mut self, failure: &UpstreamFailure) -> Self {
        self.upstream_error = failure.upstream_error();
        self.raw = failure.raw_body().map(str::to_string);
        self
    }

    pub fn extra(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.extra.insert(key.to_string(), value);
        }
        self
    }

    pub fn build(self) -> ModuleResponse {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(false));
        body.insert("error".to_string(), Value::String(self.message));
        body.insert("module".to_string(), Value::String(self.module.to_string()));
        body.insert(
            "upstream_error".to_string(),
            self.upstream_error.unwrap_or(Value::Null),
        );
        if let Some(raw) = self.raw {
            body.insert("error_response_content".to_string(), Value::String(raw));
        }
        body.extend(self.extra);

        ModuleResponse::json(self.status, Value::Object(body))
    }
}

/// 上游失败对应的本地状态码：上游 HTTP 错误透传，其他为 502 / 504
pub fn upstream_status(failure: &UpstreamFailure) -> StatusCode {
    match failure {
        UpstreamFailure::Http { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        UpstreamFailure::Timeout => StatusCode::GATEWAY_TIMEOUT,
        UpstreamFailure::Network(_) | UpstreamFailure::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
    }
}

/// 功能模块
#[async_trait]
pub trait Module: Send + Sync {
    /// 模块唯一名称
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// 路由表，注册时读取一次
    fn routes(&self) -> Vec<Route>;

    /// 注册前的配置检查
    fn validate_config(&self) -> Result<(), String> {
        Ok(())
    }

    /// 处理分发到本模块的请求
    async fn handle_request(&self, request: ModuleRequest) -> ModuleResponse;
}

/// 模块信息（`GET /api/modules`）
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    pub description: String,
    pub routes: Vec<String>,
}
