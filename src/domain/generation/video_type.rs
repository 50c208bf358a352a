//! Generation Context - Video Type & Model Selection

use std::fmt;
use std::str::FromStr;

pub const MODEL_PRO: &str = "doubao-seedance-1-0-pro-250528";
pub const MODEL_LITE_T2V: &str = "doubao-seedance-1-0-lite-t2v-250428";
pub const MODEL_LITE_I2V: &str = "doubao-seedance-1-0-lite-i2v-250428";
/// `/generate_video` 参考图接口固定使用的模型
pub const MODEL_VIDEO_PRO: &str = "doubao-video-pro";

/// 视频生成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoType {
    /// 纯文本生视频
    TextToVideo,
    /// 首帧图生视频
    FirstFrame,
    /// 首尾帧图生视频
    FirstLastFrame,
}

impl VideoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextToVideo => "text_to_video",
            Self::FirstFrame => "image_to_video_first_frame",
            Self::FirstLastFrame => "image_to_video_first_last_frame",
        }
    }

    pub fn needs_first_frame(&self) -> bool {
        matches!(self, Self::FirstFrame | Self::FirstLastFrame)
    }

    pub fn needs_last_frame(&self) -> bool {
        matches!(self, Self::FirstLastFrame)
    }
}

impl FromStr for VideoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text_to_video" => Ok(Self::TextToVideo),
            "image_to_video_first_frame" => Ok(Self::FirstFrame),
            "image_to_video_first_last_frame" => Ok(Self::FirstLastFrame),
            other => Err(format!("unsupported video_type: {}", other)),
        }
    }
}

impl fmt::Display for VideoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 模型档位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Lite,
    Pro,
}

impl ModelTier {
    /// 页面传入的 model_type 包含 "pro" 时使用 Pro，默认 Lite
    pub fn from_model_type(model_type: Option<&str>) -> Self {
        match model_type {
            Some(t) if t.contains("pro") => Self::Pro,
            _ => Self::Lite,
        }
    }
}

/// 根据档位和生成方式选择上游模型
pub fn select_model(model_type: Option<&str>, video_type: VideoType) -> &'static str {
    match (ModelTier::from_model_type(model_type), video_type) {
        (ModelTier::Pro, _) => MODEL_PRO,
        (ModelTier::Lite, VideoType::TextToVideo) => MODEL_LITE_T2V,
        (ModelTier::Lite, VideoType::FirstFrame | VideoType::FirstLastFrame) => MODEL_LITE_I2V,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_type() {
        assert_eq!("text_to_video".parse::<VideoType>().unwrap(), VideoType::TextToVideo);
        assert_eq!(
            "image_to_video_first_last_frame".parse::<VideoType>().unwrap(),
            VideoType::FirstLastFrame
        );
        assert!("video_to_video".parse::<VideoType>().is_err());
    }

    #[test]
    fn test_select_model() {
        assert_eq!(select_model(None, VideoType::TextToVideo), MODEL_LITE_T2V);
        assert_eq!(select_model(Some("seedance-1.0-lite"), VideoType::FirstFrame), MODEL_LITE_I2V);
        assert_eq!(select_model(Some("seedance-1.0-pro"), VideoType::TextToVideo), MODEL_PRO);
        assert_eq!(select_model(Some("seedance-1.0-pro"), VideoType::FirstLastFrame), MODEL_PRO);
    }

    #[test]
    fn test_frame_requirements() {
        assert!(!VideoType::TextToVideo.needs_first_frame());
        assert!(VideoType::FirstFrame.needs_first_frame());
        assert!(!VideoType::FirstFrame.needs_last_frame());
        assert!(VideoType::FirstLastFrame.needs_last_frame());
    }
}
