//! Builders
//!
//! Fluent builders for SDK configuration.

pub mod config;

pub use config::*;
