//! HTTP Ark Client - 调用方舟 API
//!
//! 实现 ArkApiPort trait。每个实例绑定一个 endpoint：
//! - 视频生成任务：POST {endpoint} 创建任务，GET {endpoint}/{task_id} 查询状态
//! - 视频理解：POST {endpoint}（chat completions）

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

use crate::application::ports::{ArkApiPort, UpstreamFailure};

/// HTTP Ark 客户端配置
#[derive(Debug, Clone)]
pub struct HttpArkClientConfig {
    pub endpoint: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl HttpArkClientConfig {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs,
        }
    }
}

pub struct HttpArkClient {
    client: Client,
    config: HttpArkClientConfig,
}

impl HttpArkClient {
    pub fn new(config: HttpArkClientConfig) -> Result<Self, UpstreamFailure> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamFailure::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn resource_url(&self, resource_id: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), resource_id)
    }

    /// 发送请求并解析 JSON 响应
    ///
    /// 非 2xx 状态码时保留原始响应文本。
    async fn execute(&self, request: RequestBuilder, api_key: &str) -> Result<Value, UpstreamFailure> {
        let response = request
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamFailure::Timeout
                } else if e.is_connect() {
                    UpstreamFailure::Network(format!("Cannot connect to Ark API: {}", e))
                } else {
                    UpstreamFailure::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamFailure::Timeout
            } else {
                UpstreamFailure::InvalidResponse(format!("Failed to read response: {}", e))
            }
        })?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body_len = body.len(),
                "Ark API returned error status"
            );
            return Err(UpstreamFailure::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| UpstreamFailure::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ArkApiPort for HttpArkClient {
    async fn submit(&self, api_key: &str, body: &Value) -> Result<Value, UpstreamFailure> {
        tracing::debug!(url = %self.config.endpoint, "Sending Ark API request");

        let request = self.client.post(&self.config.endpoint).json(body);
        self.execute(request, api_key).await
    }

    async fn fetch(&self, api_key: &str, resource_id: &str) -> Result<Value, UpstreamFailure> {
        let url = self.resource_url(resource_id);
        tracing::debug!(url = %url, "Fetching Ark resource");

        let request = self.client.get(&url);
        self.execute(request, api_key).await
    }
}
