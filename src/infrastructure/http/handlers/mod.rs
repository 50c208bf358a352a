//! HTTP Handlers

mod dispatch;
mod modules;
mod ping;

pub use dispatch::*;
pub use modules::*;
pub use ping::*;
