//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod ark;
pub mod storage;

pub use ark::*;
pub use storage::*;
