//! CLI command implementations.

pub mod classify;
pub mod list;
pub mod plan;
pub mod run;
