//! Ark Adapter - 方舟 HTTP API 客户端实现

mod http_ark_client;

pub use http_ark_client::{HttpArkClient, HttpArkClientConfig};
