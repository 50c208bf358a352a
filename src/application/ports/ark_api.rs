//! Ark API Port - 远程生成服务抽象
//!
//! 定义视频生成任务 / 视频理解接口的调用抽象，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// 上游调用失败
#[derive(Debug, Clone, Error)]
pub enum UpstreamFailure {
    /// 上游返回非 2xx 状态码
    #[error("HTTP {status}: {reason}")]
    Http {
        status: u16,
        reason: String,
        /// 上游原始响应文本
        body: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    /// 2xx 但响应体无法解析
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl UpstreamFailure {
    /// 上游 HTTP 状态码
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 上游原始响应文本（仅 HTTP 错误时存在）
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::Http { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// 原始响应中的 `error` 对象
    ///
    /// 响应体不是 JSON 或 `error` 不是对象时返回 None。
    pub fn upstream_error(&self) -> Option<Value> {
        let body = self.raw_body()?;
        let parsed: Value = serde_json::from_str(body).ok()?;
        parsed.get("error").filter(|e| e.is_object()).cloned()
    }
}

/// Ark API Port
///
/// 每个实例绑定一个上游 endpoint。
#[async_trait]
pub trait ArkApiPort: Send + Sync {
    /// POST JSON 到 endpoint，返回解析后的响应
    async fn submit(&self, api_key: &str, body: &Value) -> Result<Value, UpstreamFailure>;

    /// GET `{endpoint}/{resource_id}`
    async fn fetch(&self, api_key: &str, resource_id: &str) -> Result<Value, UpstreamFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_from_json_body() {
        let failure = UpstreamFailure::Http {
            status: 400,
            reason: "Bad Request".to_string(),
            body: r#"{"error":{"code":"InvalidParameter","message":"bad"}}"#.to_string(),
        };
        let error = failure.upstream_error().unwrap();
        assert_eq!(error["code"], "InvalidParameter");
        assert_eq!(failure.status(), Some(400));
    }

    #[test]
    fn test_upstream_error_absent_for_plain_text() {
        let failure = UpstreamFailure::Http {
            status: 502,
            reason: "Bad Gateway".to_string(),
            body: "<html>bad gateway</html>".to_string(),
        };
        assert!(failure.upstream_error().is_none());
        assert_eq!(failure.raw_body(), Some("<html>bad gateway</html>"));
    }

    #[test]
    fn test_network_failure_has_no_body() {
        let failure = UpstreamFailure::Timeout;
        assert!(failure.raw_body().is_none());
        assert!(failure.status().is_none());
        assert_eq!(failure.to_string(), "Request timeout");
    }
}
