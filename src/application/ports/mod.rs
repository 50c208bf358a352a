//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod ark_api;
mod object_storage;

pub use ark_api::{ArkApiPort, UpstreamFailure};
pub use object_storage::{ObjectStoragePort, StorageError, UploadedObject};
