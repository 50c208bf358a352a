//! 文生视频 / 首帧 / 首尾帧生视频模块

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde_json::{json, Value};

use super::form::FormData;
use super::module::{Endpoint, HandlerResult, Module, ModuleRequest, ModuleResponse, Route};
use super::support::{check_size, parse_form, upload_field, upstream_failure};
use crate::application::ports::{ArkApiPort, ObjectStoragePort};
use crate::config::{LimitsConfig, LogSwitches, TextToVideoConfig};
use crate::domain::generation::{PromptOptions, TaskRequest, VideoType};

pub const MODULE_NAME: &str = "text_to_video";

const TASK_STATUS_PREFIX: &str = "/video_task_status/";

/// 一次任务创建所需的参数
struct VideoTask<'a> {
    prompt: &'a str,
    video_type: VideoType,
    model_type: Option<&'a str>,
    options: PromptOptions,
    first_frame_url: Option<String>,
    last_frame_url: Option<String>,
    page_api_key: &'a str,
}

pub struct TextToVideoModule {
    config_api_key: String,
    max_file_size: usize,
    ark: Arc<dyn ArkApiPort>,
    storage: Arc<dyn ObjectStoragePort>,
    log: LogSwitches,
}

impl TextToVideoModule {
    pub const NAME: &'static str = MODULE_NAME;

    pub fn new(
        config: &TextToVideoConfig,
        limits: &LimitsConfig,
        log: LogSwitches,
        ark: Arc<dyn ArkApiPort>,
        storage: Arc<dyn ObjectStoragePort>,
    ) -> Self {
        let config_api_key = config.ark_api_key.trim().to_string();
        if log.enable_initialization_log {
            tracing::info!(
                module = MODULE_NAME,
                endpoint = %config.endpoint,
                config_api_key = !config_api_key.is_empty(),
                "Module initialized"
            );
        }

        Self {
            config_api_key,
            max_file_size: limits.max_file_size_bytes(),
            ark,
            storage,
            log,
        }
    }

    /// 页面传入的 key 优先，其次配置文件
    fn resolve_api_key<'a>(&'a self, page_key: &'a str) -> HandlerResult<&'a str> {
        let key = if page_key.is_empty() {
            self.config_api_key.as_str()
        } else {
            page_key
        };
        if key.is_empty() {
            return Err(bad_request("API key is required"));
        }
        Ok(key)
    }

    async fn create_task(&self, task: VideoTask<'_>) -> HandlerResult<String> {
        let api_key = self.resolve_api_key(task.page_api_key)?;
        let request = TaskRequest::for_video(
            task.prompt,
            task.video_type,
            task.model_type,
            &task.options,
            task.first_frame_url.as_deref(),
            task.last_frame_url.as_deref(),
        );
        let body = serde_json::to_value(&request).map_err(|e| {
            ModuleResponse::error(StatusCode::INTERNAL_SERVER_ERROR, MODULE_NAME, e.to_string())
        })?;

        if self.log.enable_api_request_log {
            tracing::info!(
                module = MODULE_NAME,
                video_type = %task.video_type,
                model = %request.model,
                request = %body,
                "Creating video task"
            );
        }

        let result = self
            .ark
            .submit(api_key, &body)
            .await
            .map_err(|e| upstream_failure(MODULE_NAME, &self.log, "failed to create task", &e).build())?;

        if self.log.enable_api_response_log {
            tracing::info!(module = MODULE_NAME, response = %result, "Video task response");
        }

        match result.get("id").and_then(Value::as_str) {
            Some(task_id) if !task_id.is_empty() => Ok(task_id.to_string()),
            _ => {
                if self.log.enable_error_traceback {
                    tracing::error!(module = MODULE_NAME, response = %result, "Task id missing in response");
                }
                Err(ModuleResponse::error(
                    StatusCode::BAD_GATEWAY,
                    MODULE_NAME,
                    "failed to create task: response is missing task id",
                ))
            }
        }
    }

    /// POST /text_to_video（JSON）
    async fn text_to_video(&self, request: &ModuleRequest) -> HandlerResult {
        request.require_method(MODULE_NAME, Method::POST)?;

        let data: Value = serde_json::from_slice(&request.body)
            .map_err(|_| bad_request("invalid request body"))?;

        let prompt = json_text(&data, "prompt");
        if prompt.is_empty() {
            return Err(bad_request("prompt is required"));
        }
        let model_type = json_text(&data, "model_type");
        let api_key = json_text(&data, "api_key");

        let options = PromptOptions {
            resolution: non_empty(json_text(&data, "resolution")),
            aspect_ratio: non_empty(json_text(&data, "aspect_ratio")),
            duration: json_int(&data, "duration").and_then(|d| u32::try_from(d).ok()),
            seed: json_int(&data, "seed"),
            fixed_camera: json_flag(&data, "fixed_camera"),
        };

        if self.log.enable_request_log {
            tracing::info!(
                module = MODULE_NAME,
                prompt_len = prompt.chars().count(),
                options = ?options,
                model_type = %model_type,
                "Text to video request"
            );
        }

        let task_id = self
            .create_task(VideoTask {
                prompt: &prompt,
                video_type: VideoType::TextToVideo,
                model_type: Some(model_type.as_str()).filter(|m| !m.is_empty()),
                options,
                first_frame_url: None,
                last_frame_url: None,
                page_api_key: &api_key,
            })
            .await?;

        Ok(ModuleResponse::ok(json!({
            "success": true,
            "task_id": task_id,
            "message": "text-to-video task created",
        })))
    }

    /// POST /image_to_video_advanced（multipart）
    ///
    /// `video_type` 缺省为首帧模式；首尾帧模式需要同时提供 `first_frame` 与 `last_frame`。
    async fn image_to_video_advanced(&self, request: &ModuleRequest) -> HandlerResult {
        request.require_method(MODULE_NAME, Method::POST)?;
        request.require_multipart(MODULE_NAME)?;

        let form = parse_form(MODULE_NAME, request).await?;
        if self.log.enable_request_log {
            tracing::info!(module = MODULE_NAME, fields = ?form.field_names(), "Image to video request");
        }

        let video_type = match form.text("video_type").as_str() {
            "" => VideoType::FirstFrame,
            other => other.parse::<VideoType>().map_err(|e| bad_request(&e))?,
        };

        let first_frame = form.file("first_frame").filter(|_| video_type.needs_first_frame());
        let last_frame = form.file("last_frame").filter(|_| video_type.needs_last_frame());
        if video_type.needs_first_frame() && first_frame.is_none() {
            return Err(bad_request("first frame image is required"));
        }
        if video_type.needs_last_frame() && last_frame.is_none() {
            return Err(bad_request("last frame image is required"));
        }

        for file in first_frame.iter().chain(last_frame.iter()) {
            check_size(MODULE_NAME, file, self.max_file_size)?;
        }

        let mut first_frame_url = None;
        if let Some(file) = first_frame {
            first_frame_url =
                Some(upload_field(self.storage.as_ref(), MODULE_NAME, &self.log, file, "first_frame.jpg").await?);
        }
        let mut last_frame_url = None;
        if let Some(file) = last_frame {
            last_frame_url =
                Some(upload_field(self.storage.as_ref(), MODULE_NAME, &self.log, file, "last_frame.jpg").await?);
        }

        let prompt = form.text("prompt");
        let model_type = form.text("model_type");
        let api_key = form.text("api_key");
        let options = form_options(&form);

        if self.log.enable_request_log {
            tracing::info!(
                module = MODULE_NAME,
                video_type = %video_type,
                options = ?options,
                model_type = %model_type,
                "Image to video parameters"
            );
        }

        let task_id = self
            .create_task(VideoTask {
                prompt: &prompt,
                video_type,
                model_type: Some(model_type.as_str()).filter(|m| !m.is_empty()),
                options,
                first_frame_url,
                last_frame_url,
                page_api_key: &api_key,
            })
            .await?;

        Ok(ModuleResponse::ok(json!({
            "success": true,
            "task_id": task_id,
            "message": "image-to-video task created",
        })))
    }

    /// GET /video_task_status/{task_id}
    async fn video_task_status(&self, request: &ModuleRequest) -> HandlerResult {
        request.require_method(MODULE_NAME, Method::GET)?;

        let task_id = request.path_param(TASK_STATUS_PREFIX);
        if task_id.is_empty() {
            return Err(bad_request("task id is required"));
        }
        let api_key = self.resolve_api_key(request.bearer_token().unwrap_or_default())?;

        let result = self.ark.fetch(api_key, task_id).await.map_err(|e| {
            upstream_failure(MODULE_NAME, &self.log, "failed to query task status", &e)
                .extra("status", "failed")
                .build()
        })?;

        if self.log.enable_api_response_log {
            tracing::debug!(module = MODULE_NAME, task_id, response = %result, "Task status fetched");
        }
        Ok(ModuleResponse::ok(result))
    }

    /// POST /upload_video_image
    async fn upload_video_image(&self, request: &ModuleRequest) -> HandlerResult {
        request.require_method(MODULE_NAME, Method::POST)?;
        request.require_multipart(MODULE_NAME)?;

        let form = parse_form(MODULE_NAME, request).await?;
        let file = form
            .file("image")
            .ok_or_else(|| bad_request("image file is required"))?;
        check_size(MODULE_NAME, file, self.max_file_size)?;

        let url = upload_field(self.storage.as_ref(), MODULE_NAME, &self.log, file, "image.jpg").await?;
        Ok(ModuleResponse::ok(json!({
            "success": true,
            "url": url,
            "message": "image uploaded",
        })))
    }
}

fn bad_request(message: &str) -> ModuleResponse {
    ModuleResponse::error(StatusCode::BAD_REQUEST, MODULE_NAME, message)
}

fn non_empty(value: String) -> Option<String> {
    Some(value).filter(|v| !v.is_empty())
}

fn json_text(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// 整数字段，兼容数字字符串；无法解析时视为未设置
fn json_int(data: &Value, key: &str) -> Option<i64> {
    match data.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_flag(data: &Value, key: &str) -> bool {
    match data.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => is_truthy_flag(s),
        _ => false,
    }
}

fn is_truthy_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn form_options(form: &FormData) -> PromptOptions {
    PromptOptions {
        resolution: non_empty(form.text("resolution")),
        aspect_ratio: non_empty(form.text("aspect_ratio")),
        duration: form.text("duration").parse().ok(),
        seed: form.text("seed").parse().ok(),
        fixed_camera: is_truthy_flag(&form.text("fixed_camera")),
    }
}

#[async_trait]
impl Module for TextToVideoModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn description(&self) -> &str {
        "Text to video and first/last frame to video generation"
    }

    fn routes(&self) -> Vec<Route> {
        vec![
            Route::new("/text_to_video", Endpoint::TextToVideo),
            Route::new("/image_to_video_advanced", Endpoint::ImageToVideoAdvanced),
            Route::new(TASK_STATUS_PREFIX, Endpoint::VideoTaskStatus),
            Route::new("/upload_video_image", Endpoint::UploadVideoImage),
        ]
    }

    async fn handle_request(&self, request: ModuleRequest) -> ModuleResponse {
        if self.log.enable_request_log {
            tracing::info!(
                module = MODULE_NAME,
                path = %request.path,
                method = %request.method,
                content_type = request.content_type(),
                "Module request"
            );
        }

        let result = match request.endpoint {
            Endpoint::TextToVideo => self.text_to_video(&request).await,
            Endpoint::ImageToVideoAdvanced => self.image_to_video_advanced(&request).await,
            Endpoint::VideoTaskStatus => self.video_task_status(&request).await,
            Endpoint::UploadVideoImage => self.upload_video_image(&request).await,
            _ => Err(ModuleResponse::not_found(&request.path)),
        };
        result.unwrap_or_else(|response| response)
    }
}
