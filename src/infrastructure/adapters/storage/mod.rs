//! Storage Adapter - 对象存储实现

mod tosutil_storage;

pub use tosutil_storage::{object_key, TosutilStorage};
