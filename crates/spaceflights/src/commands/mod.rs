//! CLI command implementations.

pub mod evaluate;
pub mod pipeline;
pub mod train;
