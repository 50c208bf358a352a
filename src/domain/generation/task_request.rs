//! Generation Context - Upstream Request Bodies

use serde::Serialize;

use super::video_type::{select_model, VideoType, MODEL_LITE_I2V, MODEL_VIDEO_PRO};

/// 图片在生成任务中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRole {
    FirstFrame,
    LastFrame,
    ReferenceImage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// 生成任务的 content 数组元素
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    ImageUrl { image_url: ImageUrl, role: ImageRole },
}

impl ContentItem {
    pub fn image(url: impl Into<String>, role: ImageRole) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
            role,
        }
    }
}

/// 提示词附加参数
///
/// 上游通过提示词尾部的 `--rs` / `--rt` / `--dur` / `--seed` / `--cf` 指令接收这些参数。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptOptions {
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
    pub duration: Option<u32>,
    pub seed: Option<i64>,
    pub fixed_camera: bool,
}

impl PromptOptions {
    pub fn apply(&self, prompt: &str) -> String {
        let mut enhanced = prompt.to_string();

        if let Some(resolution) = self.resolution.as_deref().filter(|s| !s.is_empty()) {
            enhanced.push_str(&format!(" --rs {}", resolution));
        }
        if let Some(ratio) = self.aspect_ratio.as_deref().filter(|s| !s.is_empty()) {
            enhanced.push_str(&format!(" --rt {}", ratio));
        }
        // 时长为 0 视为未设置
        if let Some(duration) = self.duration.filter(|d| *d > 0) {
            enhanced.push_str(&format!(" --dur {}", duration));
        }
        if let Some(seed) = self.seed {
            enhanced.push_str(&format!(" --seed {}", seed));
        }
        if self.fixed_camera {
            enhanced.push_str(" --cf True");
        }

        enhanced
    }
}

/// 视频生成任务请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRequest {
    pub model: String,
    pub content: Vec<ContentItem>,
}

impl TaskRequest {
    /// 文生视频 / 首帧 / 首尾帧任务
    ///
    /// 首尾帧 URL 按 `video_type` 取舍，纯文本任务忽略图片。
    pub fn for_video(
        prompt: &str,
        video_type: VideoType,
        model_type: Option<&str>,
        options: &PromptOptions,
        first_frame_url: Option<&str>,
        last_frame_url: Option<&str>,
    ) -> Self {
        let mut content = vec![ContentItem::Text {
            text: options.apply(prompt),
        }];

        if video_type.needs_first_frame() {
            if let Some(url) = first_frame_url {
                content.push(ContentItem::image(url, ImageRole::FirstFrame));
            }
        }
        if video_type.needs_last_frame() {
            if let Some(url) = last_frame_url {
                content.push(ContentItem::image(url, ImageRole::LastFrame));
            }
        }

        Self {
            model: select_model(model_type, video_type).to_string(),
            content,
        }
    }

    /// 参考图生视频任务
    pub fn with_reference_images<I, S>(prompt: &str, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut content = vec![ContentItem::Text {
            text: prompt.to_string(),
        }];
        content.extend(
            urls.into_iter()
                .map(|url| ContentItem::image(url, ImageRole::ReferenceImage)),
        );

        Self {
            model: MODEL_LITE_I2V.to_string(),
            content,
        }
    }
}

/// 参考图任务（`/generate_video` 表单接口）
///
/// 与 content 数组格式不同，参考图 URL 平铺在 `reference_images` 字段。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceVideoTask {
    pub model: String,
    pub prompt: String,
    pub reference_images: Vec<String>,
}

impl ReferenceVideoTask {
    pub fn new(prompt: &str, reference_images: Vec<String>) -> Self {
        Self {
            model: MODEL_VIDEO_PRO.to_string(),
            prompt: prompt.to_string(),
            reference_images,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoUrl {
    pub url: String,
    pub fps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatContent {
    VideoUrl { video_url: VideoUrl },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ChatContent>,
}

/// 视频理解（chat completions）请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn video_comprehension(model: &str, video_url: &str, prompt: &str, fps: f64) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ChatContent::VideoUrl {
                        video_url: VideoUrl {
                            url: video_url.to_string(),
                            fps,
                        },
                    },
                    ChatContent::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        }
    }
}
