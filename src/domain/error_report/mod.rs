//! Error Report Context
//!
//! 上游错误归一化与展示

mod error_info;
mod render;

pub use error_info::{extract_upstream, ErrorInfo, RawShape, ResultShape};
pub use render::{render_error_html, ErrorPanel, ErrorView};
