//! 视频理解模块
//!
//! 调用视觉模型理解视频内容，按提示词生成文案。

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde_json::{json, Value};

use super::module::{Endpoint, HandlerResult, Module, ModuleRequest, ModuleResponse, Route};
use super::support::{parse_form, upload_field, upstream_failure};
use crate::application::ports::{ArkApiPort, ObjectStoragePort};
use crate::config::{LimitsConfig, LogSwitches, VideoComprehensionConfig};
use crate::domain::generation::ChatRequest;

pub const MODULE_NAME: &str = "video_comprehension";

pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "webm"];

const DEFAULT_FPS: f64 = 1.0;

/// 视频理解请求参数
#[derive(Debug, Clone, PartialEq)]
struct ComprehensionParams {
    api_key: String,
    video_url: String,
    prompt: String,
    fps: f64,
}

pub struct VideoComprehensionModule {
    config_api_key: String,
    model: String,
    max_video_size: usize,
    ark: Arc<dyn ArkApiPort>,
    storage: Arc<dyn ObjectStoragePort>,
    log: LogSwitches,
}

impl VideoComprehensionModule {
    pub const NAME: &'static str = MODULE_NAME;

    pub fn new(
        config: &VideoComprehensionConfig,
        limits: &LimitsConfig,
        log: LogSwitches,
        ark: Arc<dyn ArkApiPort>,
        storage: Arc<dyn ObjectStoragePort>,
    ) -> Self {
        let config_api_key = config.api_key.trim().to_string();
        if log.enable_initialization_log {
            if config_api_key.is_empty() {
                tracing::info!(module = MODULE_NAME, "No API key configured, using key from page");
            } else {
                tracing::info!(module = MODULE_NAME, model = %config.model, "Using configured API key");
            }
        }

        Self {
            config_api_key,
            model: config.model.clone(),
            max_video_size: limits.max_video_size_bytes(),
            ark,
            storage,
            log,
        }
    }

    /// JSON 请求体优先；不是 JSON 时按 multipart 表单解析
    async fn read_params(&self, request: &ModuleRequest) -> HandlerResult<ComprehensionParams> {
        if let Ok(data) = serde_json::from_slice::<Value>(&request.body) {
            if data.is_object() {
                let fps = match data.get("fps") {
                    None | Some(Value::Null) => DEFAULT_FPS,
                    Some(value) => parse_fps(value)?,
                };
                return Ok(ComprehensionParams {
                    api_key: json_text(&data, "api_key"),
                    video_url: json_text(&data, "video_url"),
                    prompt: json_text(&data, "prompt"),
                    fps,
                });
            }
        }

        if !request.is_multipart() {
            if self.log.enable_error_traceback {
                tracing::error!(
                    module = MODULE_NAME,
                    content_type = request.content_type(),
                    "Unrecognized request body"
                );
            }
            return Err(bad_request("invalid request format"));
        }

        let form = parse_form(MODULE_NAME, request).await?;
        let fps = match form.text("fps").as_str() {
            "" => DEFAULT_FPS,
            text => parse_fps(&Value::String(text.to_string()))?,
        };
        Ok(ComprehensionParams {
            api_key: form.text("api_key"),
            video_url: form.text("video_url"),
            prompt: form.text("prompt"),
            fps,
        })
    }

    /// POST /video_comprehension_gen_text
    async fn gen_text(&self, request: &ModuleRequest) -> HandlerResult {
        request.require_method(MODULE_NAME, Method::POST)?;

        let params = self.read_params(request).await?;
        if self.log.enable_request_log {
            tracing::info!(
                module = MODULE_NAME,
                api_key = if params.api_key.is_empty() { "empty" } else { "***" },
                video_url = %params.video_url,
                prompt_len = params.prompt.chars().count(),
                fps = params.fps,
                "Video comprehension request"
            );
        }

        if params.api_key.is_empty() && self.config_api_key.is_empty() {
            return Err(bad_request("API key is required"));
        }
        if params.video_url.is_empty() {
            return Err(bad_request("video URL is required"));
        }
        if params.prompt.is_empty() {
            return Err(bad_request("prompt is required"));
        }

        // 配置文件中的 key 优先
        let api_key = if self.config_api_key.is_empty() {
            params.api_key.as_str()
        } else {
            self.config_api_key.as_str()
        };

        let chat = ChatRequest::video_comprehension(&self.model, &params.video_url, &params.prompt, params.fps);
        let body = serde_json::to_value(&chat).map_err(|e| {
            ModuleResponse::error(StatusCode::INTERNAL_SERVER_ERROR, MODULE_NAME, e.to_string())
        })?;

        if self.log.enable_api_request_log {
            tracing::info!(module = MODULE_NAME, request = %body, "Calling video comprehension API");
        }

        let response = self
            .ark
            .submit(api_key, &body)
            .await
            .map_err(|e| upstream_failure(MODULE_NAME, &self.log, "API request failed", &e).build())?;

        if self.log.enable_api_response_log {
            tracing::info!(module = MODULE_NAME, response = %response, "Video comprehension API response");
        }

        let content = first_choice_content(&response).ok_or_else(|| {
            ModuleResponse::error(
                StatusCode::BAD_GATEWAY,
                MODULE_NAME,
                "no valid response from model",
            )
        })?;

        Ok(ModuleResponse::ok(json!({
            "success": true,
            "message": "video comprehension completed",
            "result": content,
        })))
    }

    /// POST /upload_video
    async fn upload_video(&self, request: &ModuleRequest) -> HandlerResult {
        request.require_method(MODULE_NAME, Method::POST)?;

        let form = parse_form(MODULE_NAME, request).await?;
        if self.log.enable_request_log {
            tracing::info!(
                module = MODULE_NAME,
                body_len = request.body.len(),
                fields = ?form.field_names(),
                "Video upload request"
            );
        }

        let Some(file) = form.file("video") else {
            if self.log.enable_error_traceback {
                tracing::error!(module = MODULE_NAME, fields = ?form.field_names(), "Video field missing");
            }
            return Err(bad_request("video file not found"));
        };

        let filename = file.filename_or("");
        if !is_supported_video(filename) {
            return Err(bad_request(
                "unsupported video format, please upload mp4, avi, mov, mkv or webm",
            ));
        }
        if file.len() > self.max_video_size {
            return Err(bad_request(&format!(
                "video file must not exceed {}MB",
                self.max_video_size / (1024 * 1024)
            )));
        }

        let url = upload_field(self.storage.as_ref(), MODULE_NAME, &self.log, file, filename).await?;
        Ok(ModuleResponse::ok(json!({
            "success": true,
            "url": url,
            "message": "video uploaded",
        })))
    }
}

fn bad_request(message: &str) -> ModuleResponse {
    ModuleResponse::error(StatusCode::BAD_REQUEST, MODULE_NAME, message)
}

fn json_text(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn parse_fps(value: &Value) -> HandlerResult<f64> {
    let fps = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    fps.filter(|f| f.is_finite() && *f > 0.0)
        .ok_or_else(|| bad_request("fps must be a positive number"))
}

fn is_supported_video(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// `choices[0].message.content`
fn first_choice_content(response: &Value) -> Option<&Value> {
    response
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")
}

#[async_trait]
impl Module for VideoComprehensionModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn description(&self) -> &str {
        "Video comprehension with vision model"
    }

    fn routes(&self) -> Vec<Route> {
        vec![
            Route::new("/video_comprehension_gen_text", Endpoint::VideoComprehensionGenText),
            Route::new("/upload_video", Endpoint::UploadVideo),
        ]
    }

    async fn handle_request(&self, request: ModuleRequest) -> ModuleResponse {
        let result = match request.endpoint {
            Endpoint::VideoComprehensionGenText => self.gen_text(&request).await,
            Endpoint::UploadVideo => self.upload_video(&request).await,
            _ => Err(ModuleResponse::not_found(&request.path)),
        };
        result.unwrap_or_else(|response| response)
    }
}
