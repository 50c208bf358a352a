//! Feature Modules - 功能模块与模块管理器
//!
//! - module: 模块能力约定（路由表、请求、响应）
//! - manager: 注册、冲突检测、按路径分发
//! - reference_image / text_to_video / video_comprehension: 具体功能模块

mod form;
mod manager;
mod module;
mod reference_image;
mod support;
mod text_to_video;
mod video_comprehension;

pub use form::{FormData, FormError, FormField};
pub use manager::{ModuleManager, RegistryError};
pub use module::{
    upstream_status, Endpoint, ErrorResponseBuilder, HandlerResult, Module, ModuleInfo,
    ModuleRequest, ModuleResponse, Route,
};
pub use reference_image::ReferenceImageModule;
pub use text_to_video::TextToVideoModule;
pub use video_comprehension::VideoComprehensionModule;
