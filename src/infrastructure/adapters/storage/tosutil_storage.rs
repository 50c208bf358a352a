//! TOS 对象存储 - 基于 tosutil 命令行工具
//!
//! 上传流程：
//! 1. 内容写入临时文件
//! 2. `tosutil cp <file> tos://{bucket}/{key}`
//! 3. 可选 `tosutil set-acl tos://{bucket}/{key} public-read`（失败只记录警告）
//!
//! 对象名格式 `{YYYYmmdd_HHMMSS}_{md5 前 8 位}_{原文件名}`。
//! 相同内容的上传结果按 MD5 缓存在内存中。

use async_trait::async_trait;
use chrono::Local;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::application::ports::{ObjectStoragePort, StorageError, UploadedObject};
use crate::config::TosConfig;

pub struct TosutilStorage {
    bucket: String,
    base_url: String,
    tosutil_path: PathBuf,
    timeout: Duration,
    /// 内容 MD5 → URL
    cache: Option<DashMap<String, String>>,
}

impl TosutilStorage {
    pub fn new(config: &TosConfig, enable_cache: bool) -> Self {
        Self {
            bucket: config.bucket_name.clone(),
            base_url: config.base_url(),
            tosutil_path: config.tosutil_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            cache: enable_cache.then(DashMap::new),
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache.as_ref().map_or(0, DashMap::len)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    fn object_uri(&self, key: &str) -> String {
        format!("tos://{}/{}", self.bucket, key)
    }

    async fn run(&self, args: &[&str]) -> Result<Output, StorageError> {
        let command = Command::new(&self.tosutil_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        tokio::time::timeout(self.timeout, command)
            .await
            .map_err(|_| StorageError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| {
                StorageError::IoError(format!(
                    "Failed to execute {}: {}",
                    self.tosutil_path.display(),
                    e
                ))
            })
    }

    async fn copy_and_publish(
        &self,
        local_path: &Path,
        key: &str,
        public_read: bool,
    ) -> Result<(), StorageError> {
        let uri = self.object_uri(key);
        let local = local_path.to_string_lossy();

        let output = self.run(&["cp", local.as_ref(), uri.as_str()]).await?;
        if !output.status.success() {
            return Err(StorageError::UploadFailed(command_error(&output)));
        }

        if public_read {
            match self.run(&["set-acl", uri.as_str(), "public-read"]).await {
                Ok(output) if output.status.success() => {}
                Ok(output) => {
                    tracing::warn!(object = %uri, error = %command_error(&output), "Failed to set public-read ACL");
                }
                Err(e) => {
                    tracing::warn!(object = %uri, error = %e, "Failed to set public-read ACL");
                }
            }
        }

        Ok(())
    }
}

/// 对象名：`{timestamp}_{md5[..8]}_{filename}`，文件名只保留最后一级
pub fn object_key(timestamp: &str, content_md5: &str, filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("file");
    let short_hash = content_md5.get(..8).unwrap_or(content_md5);
    format!("{}_{}_{}", timestamp, short_hash, name)
}

fn command_error(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    };
    format!("tosutil exited with {}: {}", output.status, message)
}

#[async_trait]
impl ObjectStoragePort for TosutilStorage {
    async fn upload(
        &self,
        content: &[u8],
        filename: &str,
        public_read: bool,
    ) -> Result<UploadedObject, StorageError> {
        if self.bucket.is_empty() {
            return Err(StorageError::NotConfigured("tos.bucket_name is empty".to_string()));
        }

        let content_md5 = format!("{:x}", md5::compute(content));

        if let Some(url) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get(&content_md5).map(|url| url.value().clone()))
        {
            tracing::debug!(filename, url = %url, "Upload cache hit");
            return Ok(UploadedObject { url, cached: true });
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let key = object_key(&timestamp, &content_md5, filename);

        let temp_path = std::env::temp_dir().join(format!("workbench-upload-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| StorageError::IoError(format!("Failed to write temp file: {}", e)))?;

        let result = self.copy_and_publish(&temp_path, &key, public_read).await;

        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            tracing::warn!(path = %temp_path.display(), error = %e, "Failed to remove temp file");
        }
        result?;

        let url = format!("{}/{}", self.base_url, key);
        if let Some(cache) = &self.cache {
            cache.insert(content_md5, url.clone());
        }

        tracing::info!(object = %key, size = content.len(), "Object uploaded");
        Ok(UploadedObject { url, cached: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        let key = object_key("20250101_120000", "0123456789abcdef", "cat.png");
        assert_eq!(key, "20250101_120000_01234567_cat.png");

        let key = object_key("20250101_120000", "0123456789abcdef", "../../etc/passwd");
        assert_eq!(key, "20250101_120000_01234567_passwd");
    }

    #[tokio::test]
    async fn test_missing_bucket_is_not_configured() {
        let storage = TosutilStorage::new(&TosConfig::default(), true);
        let err = storage.upload(b"x", "a.png", true).await.unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured(_)));
    }

    #[cfg(unix)]
    mod with_fake_tosutil {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// 写一个记录参数的假 tosutil；`acl_exit` 为 set-acl 的退出码
        fn fake_tosutil(dir: &TempDir, cp_exit: i32, acl_exit: i32) -> PathBuf {
            let log = dir.path().join("calls.log");
            let script = dir.path().join("tosutil");
            let body = format!(
                "#!/bin/sh\necho \"$@\" >> '{log}'\nif [ \"$1\" = \"cp\" ]; then\n  [ {cp} -ne 0 ] && echo 'access denied' >&2\n  exit {cp}\nfi\nexit {acl}\n",
                log = log.display(),
                cp = cp_exit,
                acl = acl_exit,
            );
            std::fs::write(&script, body).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            script
        }

        fn storage(tosutil_path: PathBuf) -> TosutilStorage {
            let config = TosConfig {
                bucket_name: "media".to_string(),
                region: "cn-beijing".to_string(),
                tosutil_path,
                timeout_secs: 10,
            };
            TosutilStorage::new(&config, true)
        }

        fn calls(dir: &TempDir) -> Vec<String> {
            std::fs::read_to_string(dir.path().join("calls.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }

        #[tokio::test]
        async fn test_upload_copies_and_sets_acl() {
            let dir = TempDir::new().unwrap();
            let storage = storage(fake_tosutil(&dir, 0, 0));

            let object = storage.upload(b"image bytes", "cat.png", true).await.unwrap();

            assert!(!object.cached);
            assert!(object.url.starts_with("https://media.tos-cn-beijing.volces.com/"));
            assert!(object.url.ends_with("_cat.png"));

            let calls = calls(&dir);
            assert_eq!(calls.len(), 2);
            assert!(calls[0].starts_with("cp "));
            assert!(calls[0].contains("tos://media/"));
            assert!(calls[1].starts_with("set-acl tos://media/"));
            assert!(calls[1].ends_with("public-read"));
        }

        #[tokio::test]
        async fn test_same_content_served_from_cache() {
            let dir = TempDir::new().unwrap();
            let storage = storage(fake_tosutil(&dir, 0, 0));

            let first = storage.upload(b"same", "a.png", false).await.unwrap();
            let second = storage.upload(b"same", "b.png", false).await.unwrap();

            assert!(second.cached);
            assert_eq!(first.url, second.url);
            assert_eq!(calls(&dir).len(), 1);
            assert_eq!(storage.cache_size(), 1);

            storage.clear_cache();
            assert_eq!(storage.cache_size(), 0);
        }

        #[tokio::test]
        async fn test_copy_failure_reports_stderr() {
            let dir = TempDir::new().unwrap();
            let storage = storage(fake_tosutil(&dir, 3, 0));

            let err = storage.upload(b"x", "a.png", true).await.unwrap_err();
            match err {
                StorageError::UploadFailed(message) => assert!(message.contains("access denied")),
                other => panic!("unexpected error: {other:?}"),
            }
            assert_eq!(storage.cache_size(), 0);
        }

        #[tokio::test]
        async fn test_acl_failure_still_succeeds() {
            let dir = TempDir::new().unwrap();
            let storage = storage(fake_tosutil(&dir, 0, 1));

            let object = storage.upload(b"y", "a.png", true).await.unwrap();
            assert!(object.url.ends_with("_a.png"));
        }

        #[tokio::test]
        async fn test_missing_binary_is_io_error() {
            let dir = TempDir::new().unwrap();
            let storage = storage(dir.path().join("does-not-exist"));

            let err = storage.upload(b"z", "a.png", true).await.unwrap_err();
            assert!(matches!(err, StorageError::IoError(_)));
        }
    }
}
