//! 参考图生视频模块
//!
//! 上传 1..N 张参考图到对象存储，用图片 URL 创建视频生成任务，并代理任务状态查询。

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::json;

use super::module::{Endpoint, HandlerResult, Module, ModuleRequest, ModuleResponse, Route};
use super::support::{check_size, parse_form, upload_field, upstream_failure};
use crate::application::ports::{ArkApiPort, ObjectStoragePort};
use crate::config::{ApiConfig, LimitsConfig, LogSwitches};
use crate::domain::generation::{ReferenceVideoTask, TaskRequest};

pub const MODULE_NAME: &str = "image_to_video";

const TASK_STATUS_PREFIX: &str = "/task_status/";

pub struct ReferenceImageModule {
    config_api_key: String,
    max_file_size: usize,
    max_images: usize,
    ark: Arc<dyn ArkApiPort>,
    storage: Arc<dyn ObjectStoragePort>,
    log: LogSwitches,
}

impl ReferenceImageModule {
    pub const NAME: &'static str = MODULE_NAME;

    pub fn new(
        api: &ApiConfig,
        limits: &LimitsConfig,
        log: LogSwitches,
        ark: Arc<dyn ArkApiPort>,
        storage: Arc<dyn ObjectStoragePort>,
    ) -> Self {
        let config_api_key = api.api_key.trim().to_string();
        if log.enable_initialization_log {
            tracing::info!(
                module = MODULE_NAME,
                endpoint = %api.endpoint,
                config_api_key = !config_api_key.is_empty(),
                max_images = limits.max_images,
                "Module initialized"
            );
        }

        Self {
            config_api_key,
            max_file_size: limits.max_file_size_bytes(),
            max_images: limits.max_images,
            ark,
            storage,
            log,
        }
    }

    async fn submit_task<T: Serialize>(&self, api_key: &str, task: &T) -> HandlerResult<serde_json::Value> {
        let body = serde_json::to_value(task).map_err(|e| {
            ModuleResponse::error(StatusCode::INTERNAL_SERVER_ERROR, MODULE_NAME, e.to_string())
        })?;

        if self.log.enable_api_request_log {
            tracing::info!(module = MODULE_NAME, request = %body, "Creating generation task");
        }

        let result = self
            .ark
            .submit(api_key, &body)
            .await
            .map_err(|e| upstream_failure(MODULE_NAME, &self.log, "API request failed", &e).build())?;

        if self.log.enable_api_response_log {
            tracing::info!(module = MODULE_NAME, response = %result, "Generation task created");
        }
        Ok(result)
    }

    /// POST /generate_video
    ///
    /// 表单字段 `reference_image_1` .. `reference_image_{max_images}`。
    async fn generate_video(&self, request: &ModuleRequest) -> HandlerResult {
        request.require_method(MODULE_NAME, Method::POST)?;
        if request.body.is_empty() {
            return Err(bad_request("request body is empty"));
        }

        let form = parse_form(MODULE_NAME, request).await?;
        let prompt = form.text("prompt");
        // 表单 key 优先于配置
        let api_key = first_key([form.text("api_key").as_str(), self.config_api_key.as_str()])?;
        if prompt.is_empty() {
            return Err(bad_request("prompt is required"));
        }

        let files: Vec<_> = (1..=self.max_images)
            .filter_map(|index| {
                form.file(&format!("reference_image_{}", index))
                    .map(|file| (index, file))
            })
            .collect();
        if files.is_empty() {
            return Err(bad_request("at least one reference image is required"));
        }
        for (_, file) in &files {
            check_size(MODULE_NAME, file, self.max_file_size)?;
        }

        let mut image_urls = Vec::with_capacity(files.len());
        for (index, file) in files {
            let default_name = format!("image_{}.jpg", index);
            let url = upload_field(self.storage.as_ref(), MODULE_NAME, &self.log, file, &default_name).await?;
            image_urls.push(url);
        }

        let task = ReferenceVideoTask::new(&prompt, image_urls);
        let result = self.submit_task(&api_key, &task).await?;

        Ok(ModuleResponse::ok(json!({
            "success": true,
            "task_id": result.get("id").cloned().unwrap_or_default(),
            "message": "video generation task submitted",
            "data": result,
        })))
    }

    /// GET /task_status/{task_id}
    async fn task_status(&self, request: &ModuleRequest) -> HandlerResult {
        let task_id = request.path_param(TASK_STATUS_PREFIX);
        if task_id.is_empty() {
            return Err(bad_request("task id is required"));
        }
        let api_key = first_key([
            self.config_api_key.as_str(),
            request.bearer_token().unwrap_or_default(),
        ])?;

        let result = self
            .ark
            .fetch(&api_key, task_id)
            .await
            .map_err(|e| upstream_failure(MODULE_NAME, &self.log, "API request failed", &e).build())?;

        if self.log.enable_api_response_log {
            tracing::debug!(module = MODULE_NAME, task_id, response = %result, "Task status fetched");
        }
        Ok(ModuleResponse::ok(result))
    }

    /// POST /upload_image
    async fn upload_image(&self, request: &ModuleRequest) -> HandlerResult {
        request.require_method(MODULE_NAME, Method::POST)?;
        if request.body.is_empty() {
            return Err(bad_request("request body is empty"));
        }

        let form = parse_form(MODULE_NAME, request).await?;
        let file = form
            .file("image")
            .ok_or_else(|| bad_request("image file not found"))?;
        check_size(MODULE_NAME, file, self.max_file_size)?;

        let url = upload_field(
            self.storage.as_ref(),
            MODULE_NAME,
            &self.log,
            file,
            "uploaded_image.jpg",
        )
        .await?;

        Ok(ModuleResponse::ok(json!({
            "success": true,
            "url": url,
            "message": "image uploaded",
        })))
    }

    /// POST /upload_and_create_task
    ///
    /// 所有以 `image_file` 开头的文件字段都作为参考图，响应为上游原始结果。
    async fn upload_and_create_task(&self, request: &ModuleRequest) -> HandlerResult {
        request.require_method(MODULE_NAME, Method::POST)?;
        request.require_multipart(MODULE_NAME)?;

        let form = parse_form(MODULE_NAME, request).await?;
        if self.log.enable_request_log {
            tracing::info!(module = MODULE_NAME, fields = ?form.field_names(), "Upload and create task");
        }

        let prompt = form.text("prompt");
        let api_key = first_key([self.config_api_key.as_str(), form.text("api_key").as_str()])?;
        if prompt.is_empty() {
            return Err(bad_request("API key and prompt are required"));
        }

        let files: Vec<_> = form.files_with_prefix("image_file").collect();
        if files.is_empty() {
            return Err(bad_request("at least one reference image is required"));
        }
        if files.len() > self.max_images {
            return Err(bad_request(&format!(
                "at most {} reference images are supported",
                self.max_images
            )));
        }
        for file in &files {
            check_size(MODULE_NAME, file, self.max_file_size)?;
        }

        let mut image_urls = Vec::with_capacity(files.len());
        for file in files {
            let url = upload_field(self.storage.as_ref(), MODULE_NAME, &self.log, file, "image.jpg").await?;
            image_urls.push(url);
        }

        let task = TaskRequest::with_reference_images(&prompt, image_urls);
        let result = self.submit_task(&api_key, &task).await?;
        Ok(ModuleResponse::ok(result))
    }
}

/// 按顺序取第一个非空 key
fn first_key<'a>(candidates: impl IntoIterator<Item = &'a str>) -> HandlerResult<String> {
    candidates
        .into_iter()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| bad_request("API key is required"))
}

fn bad_request(message: &str) -> ModuleResponse {
    ModuleResponse::error(StatusCode::BAD_REQUEST, MODULE_NAME, message)
}

#[async_trait]
impl Module for ReferenceImageModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn description(&self) -> &str {
        "Reference images to video generation"
    }

    fn routes(&self) -> Vec<Route> {
        vec![
            Route::new("/generate_video", Endpoint::GenerateVideo),
            Route::new(TASK_STATUS_PREFIX, Endpoint::TaskStatus),
            Route::new("/upload_image", Endpoint::UploadImage),
            Route::new("/upload_and_create_task", Endpoint::UploadAndCreateTask),
        ]
    }

    async fn handle_request(&self, request: ModuleRequest) -> ModuleResponse {
        if self.log.enable_request_log {
            tracing::info!(
                module = MODULE_NAME,
                path = %request.path,
                method = %request.method,
                content_type = request.content_type(),
                body_len = request.body.len(),
                "Module request"
            );
        }

        let result = match request.endpoint {
            Endpoint::GenerateVideo => self.generate_video(&request).await,
            Endpoint::TaskStatus => self.task_status(&request).await,
            Endpoint::UploadImage => self.upload_image(&request).await,
            Endpoint::UploadAndCreateTask => self.upload_and_create_task(&request).await,
            _ => Err(ModuleResponse::not_found(&request.path)),
        };
        result.unwrap_or_else(|response| response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::modules::form::test_support::{multipart_body, Part};
    use crate::application::modules::support::fakes::{FakeArk, FakeStorage};
    use crate::application::ports::UpstreamFailure;
    use axum::body::Bytes;
    use http::{header, HeaderMap};

    fn module(api_key: &str, ark: Arc<FakeArk>, storage: Arc<FakeStorage>) -> ReferenceImageModule {
        let api = ApiConfig {
            api_key: api_key.to_string(),
            ..ApiConfig::default()
        };
        ReferenceImageModule::new(&api, &LimitsConfig::default(), LogSwitches::default(), ark, storage)
    }

    fn multipart_request(endpoint: Endpoint, path: &str, parts: &[Part<'_>]) -> ModuleRequest {
        let (headers, body) = multipart_body(parts);
        ModuleRequest {
            endpoint,
            path: path.to_string(),
            method: Method::POST,
            headers,
            body: Bytes::from(body),
        }
    }

    #[tokio::test]
    async fn test_generate_video_uploads_images_and_creates_task() {
        let ark = Arc::new(FakeArk::returning(Ok(json!({"id": "cgt-1"}))));
        let storage = Arc::new(FakeStorage::default());
        let module = module("", ark.clone(), storage.clone());

        let request = multipart_request(
            Endpoint::GenerateVideo,
            "/generate_video",
            &[
                Part::Text("prompt", "a dog surfing"),
                Part::Text("api_key", "page-key"),
                Part::File("reference_image_1", "a.png", b"A"),
                Part::File("reference_image_2", "b.png", b"B"),
            ],
        );
        let resp = module.handle_request(request).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["task_id"], "cgt-1");
        assert_eq!(storage.upload_count(), 2);

        let (key, body) = ark.last_submitted().unwrap();
        assert_eq!(key, "page-key");
        assert_eq!(body["model"], "doubao-video-pro");
        assert_eq!(body["prompt"], "a dog surfing");
        assert_eq!(body["reference_images"][1], "https://bucket.example/b.png");
    }

    #[tokio::test]
    async fn test_generate_video_form_key_overrides_config_key() {
        let ark = Arc::new(FakeArk::returning(Ok(json!({"id": "cgt-4"}))));
        let module = module("cfg-key", ark.clone(), Arc::new(FakeStorage::default()));

        let request = multipart_request(
            Endpoint::GenerateVideo,
            "/generate_video",
            &[
                Part::Text("prompt", "p"),
                Part::Text("api_key", "page-key"),
                Part::File("reference_image_1", "a.png", b"A"),
            ],
        );
        module.handle_request(request).await;
        assert_eq!(ark.last_submitted().unwrap().0, "page-key");

        let request = multipart_request(
            Endpoint::GenerateVideo,
            "/generate_video",
            &[Part::Text("prompt", "p"), Part::File("reference_image_1", "a.png", b"A")],
        );
        module.handle_request(request).await;
        assert_eq!(ark.last_submitted().unwrap().0, "cfg-key");
    }

    #[tokio::test]
    async fn test_upload_and_create_task_config_key_first() {
        let ark = Arc::new(FakeArk::returning(Ok(json!({"id": "cgt-5"}))));
        let module = module("cfg-key", ark.clone(), Arc::new(FakeStorage::default()));

        let request = multipart_request(
            Endpoint::UploadAndCreateTask,
            "/upload_and_create_task",
            &[
                Part::Text("prompt", "p"),
                Part::Text("api_key", "page-key"),
                Part::File("image_file", "1.png", b"1"),
            ],
        );
        let resp = module.handle_request(request).await;

        assert_eq!(resp.status, StatusCode::OK);
        let (key, body) = ark.last_submitted().unwrap();
        assert_eq!(key, "cfg-key");
        assert_eq!(body["content"][1]["role"], "reference_image");
    }

    #[tokio::test]
    async fn test_oversized_second_image_rejected_before_any_upload() {
        let storage = Arc::new(FakeStorage::default());
        let limits = LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        };
        let module = ReferenceImageModule::new(
            &ApiConfig::default(),
            &limits,
            LogSwitches::default(),
            Arc::new(FakeArk::default()),
            storage.clone(),
        );
        let big = vec![0u8; 1024 * 1024 + 1];

        let request = multipart_request(
            Endpoint::GenerateVideo,
            "/generate_video",
            &[
                Part::Text("prompt", "p"),
                Part::Text("api_key", "page-key"),
                Part::File("reference_image_1", "a.png", b"A"),
                Part::File("reference_image_2", "b.png", &big),
            ],
        );
        let resp = module.handle_request(request).await;

        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["error"], "file size must not exceed 1MB");
        assert_eq!(storage.upload_count(), 0);
    }

    #[test]
    fn test_module_name_matches_logging_section() {
        let config: crate::config::AppConfig = serde_json::from_value(json!({
            "logging": {"image_to_video": {"enable_upload_log": false}}
        }))
        .unwrap();

        let module = module("", Arc::new(FakeArk::default()), Arc::new(FakeStorage::default()));
        assert_eq!(module.name(), "image_to_video");
        assert!(!config.log_switches(ReferenceImageModule::NAME).enable_upload_log);
    }

    #[tokio::test]
    async fn test_generate_video_requires_image() {
        let module = module("cfg-key", Arc::new(FakeArk::default()), Arc::new(FakeStorage::default()));
        let request = multipart_request(
            Endpoint::GenerateVideo,
            "/generate_video",
            &[Part::Text("prompt", "x")],
        );

        let resp = module.handle_request(request).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["error"], "at least one reference image is required");
        assert_eq!(resp.body["module"], MODULE_NAME);
    }

    #[tokio::test]
    async fn test_upload_and_create_task_rejects_too_many_images() {
        let storage = Arc::new(FakeStorage::default());
        let module = module("cfg-key", Arc::new(FakeArk::default()), storage.clone());
        let request = multipart_request(
            Endpoint::UploadAndCreateTask,
            "/upload_and_create_task",
            &[
                Part::Text("prompt", "x"),
                Part::File("image_file_1", "1.png", b"1"),
                Part::File("image_file_2", "2.png", b"2"),
                Part::File("image_file_3", "3.png", b"3"),
                Part::File("image_file_4", "4.png", b"4"),
                Part::File("image_file_5", "5.png", b"5"),
            ],
        );

        let resp = module.handle_request(request).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(storage.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_and_create_task_carries_upstream_error() {
        let raw = r#"{"error":{"code":"InvalidParameter","message":"bad image","request_id":"req-9"}}"#;
        let ark = Arc::new(FakeArk::returning(Err(UpstreamFailure::Http {
            status: 400,
            reason: "Bad Request".to_string(),
            body: raw.to_string(),
        })));
        let module = module("cfg-key", ark, Arc::new(FakeStorage::default()));
        let request = multipart_request(
            Endpoint::UploadAndCreateTask,
            "/upload_and_create_task",
            &[Part::Text("prompt", "x"), Part::File("image_file", "1.png", b"1")],
        );

        let resp = module.handle_request(request).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["success"], false);
        assert_eq!(resp.body["upstream_error"]["code"], "InvalidParameter");
        assert_eq!(resp.body["error_response_content"], raw);
    }

    #[tokio::test]
    async fn test_upload_and_create_task_requires_multipart() {
        let module = module("cfg-key", Arc::new(FakeArk::default()), Arc::new(FakeStorage::default()));
        let request = ModuleRequest {
            endpoint: Endpoint::UploadAndCreateTask,
            path: "/upload_and_create_task".to_string(),
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{}"),
        };

        let resp = module.handle_request(request).await;
        assert_eq!(resp.body["error"], "multipart/form-data is required");
    }

    #[tokio::test]
    async fn test_task_status_uses_bearer_key_when_config_empty() {
        let ark = Arc::new(FakeArk::returning(Ok(json!({"id": "cgt-2", "status": "running"}))));
        let module = module("", ark.clone(), Arc::new(FakeStorage::default()));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer header-key".parse().unwrap());
        let request = ModuleRequest {
            endpoint: Endpoint::TaskStatus,
            path: "/task_status/cgt-2".to_string(),
            method: Method::GET,
            headers,
            body: Bytes::new(),
        };

        let resp = module.handle_request(request).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["status"], "running");
        assert_eq!(
            ark.fetched.lock().unwrap()[0],
            ("header-key".to_string(), "cgt-2".to_string())
        );
    }

    #[tokio::test]
    async fn test_task_status_without_key() {
        let module = module("", Arc::new(FakeArk::default()), Arc::new(FakeStorage::default()));
        let request = ModuleRequest {
            endpoint: Endpoint::TaskStatus,
            path: "/task_status/cgt-3".to_string(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };

        let resp = module.handle_request(request).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["error"], "API key is required");
    }

    #[tokio::test]
    async fn test_upload_image_storage_failure() {
        let module = module("", Arc::new(FakeArk::default()), Arc::new(FakeStorage::failing()));
        let request = multipart_request(
            Endpoint::UploadImage,
            "/upload_image",
            &[Part::File("image", "a.png", b"A")],
        );

        let resp = module.handle_request(request).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.body["error"].as_str().unwrap().starts_with("upload failed"));
    }
}
