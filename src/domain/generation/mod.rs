//! Generation Context
//!
//! 视频生成任务与视频理解请求的值对象

mod task_request;
mod video_type;

pub use task_request::{
    ChatContent, ChatMessage, ChatRequest, ContentItem, ImageRole, ImageUrl, PromptOptions,
    ReferenceVideoTask, TaskRequest, VideoUrl,
};
pub use video_type::{
    select_model, ModelTier, VideoType, MODEL_LITE_I2V, MODEL_LITE_T2V, MODEL_PRO, MODEL_VIDEO_PRO,
};
