//! 模块共用的上传与上游失败处理

use http::StatusCode;

use super::form::{FormData, FormField};
use super::module::{ErrorResponseBuilder, HandlerResult, ModuleRequest, ModuleResponse};
use crate::application::ports::{ObjectStoragePort, UpstreamFailure};
use crate::config::LogSwitches;

/// 解析请求体中的表单，失败时返回 400
pub async fn parse_form(module: &str, request: &ModuleRequest) -> HandlerResult<FormData> {
    FormData::parse(&request.headers, request.body.clone())
        .await
        .map_err(|e| {
            ModuleResponse::error(
                StatusCode::BAD_REQUEST,
                module,
                format!("failed to parse form data: {}", e),
            )
        })
}

pub fn check_size(module: &str, field: &FormField, max_bytes: usize) -> HandlerResult<()> {
    if field.len() > max_bytes {
        return Err(ModuleResponse::error(
            StatusCode::BAD_REQUEST,
            module,
            format!(
                "file size must not exceed {}MB",
                max_bytes / (1024 * 1024)
            ),
        ));
    }
    Ok(())
}

/// 上传文件并返回公开 URL，上传失败返回 500
pub async fn upload_field(
    storage: &dyn ObjectStoragePort,
    module: &str,
    log: &LogSwitches,
    field: &FormField,
    default_filename: &str,
) -> HandlerResult<String> {
    let filename = field.filename_or(default_filename);

    match storage.upload(&field.data, filename, true).await {
        Ok(object) => {
            if log.enable_upload_log {
                tracing::info!(
                    module,
                    field = %field.name,
                    filename,
                    size = field.len(),
                    cached = object.cached,
                    url = %object.url,
                    "File uploaded"
                );
            }
            Ok(object.url)
        }
        Err(e) => {
            if log.enable_error_traceback {
                tracing::error!(module, field = %field.name, filename, error = %e, "File upload failed");
            }
            Err(ModuleResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                module,
                format!("upload failed: {}", e),
            ))
        }
    }
}

/// 上游失败转换为响应，携带 `upstream_error` 与原始响应文本
pub fn upstream_failure<'a>(
    module: &'a str,
    log: &LogSwitches,
    message: &str,
    failure: &UpstreamFailure,
) -> ErrorResponseBuilder<'a> {
    if log.enable_error_traceback {
        tracing::error!(
            module,
            status = ?failure.status(),
            error = %failure,
            raw = failure.raw_body().unwrap_or_default(),
            "{}", message
        );
    }

    ErrorResponseBuilder::new(
        module,
        super::module::upstream_status(failure),
        format!("{}: {}", message, failure),
    )
    .upstream(failure)
}
