//! SDK Types
//!
//! Value types shared across the SDK.

pub mod callback;
pub mod config;
pub mod file;
pub mod metadata;
pub mod token;

pub use callback::*;
pub use config::*;
pub use file::*;
pub use metadata::*;
pub use token::*;
