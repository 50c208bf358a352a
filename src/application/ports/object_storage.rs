//! Object Storage Port - 对象存储抽象
//!
//! 上传用户文件并返回可公开访问的 URL

use async_trait::async_trait;
use thiserror::Error;

/// 对象存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object storage not configured: {0}")]
    NotConfigured(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Storage command timed out after {0}s")]
    Timeout(u64),
}

/// 上传结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub url: String,
    /// 相同内容此前已上传过，直接返回缓存的 URL
    pub cached: bool,
}

/// Object Storage Port
#[async_trait]
pub trait ObjectStoragePort: Send + Sync {
    async fn upload(
        &self,
        content: &[u8],
        filename: &str,
        public_read: bool,
    ) -> Result<UploadedObject, StorageError>;
}
