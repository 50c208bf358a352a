//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（ArkApiPort、ObjectStoragePort）
//! - modules: 功能模块与模块管理器

pub mod modules;
pub mod ports;

pub use modules::{
    Endpoint, Module, ModuleInfo, ModuleManager, ModuleRequest, ModuleResponse,
    ReferenceImageModule, RegistryError, Route, TextToVideoModule, VideoComprehensionModule,
};

pub use ports::{ArkApiPort, ObjectStoragePort, StorageError, UpstreamFailure, UploadedObject};
