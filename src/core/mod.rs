//! Core Components
//!
//! Transport, persistence, randomness and URL handling shared by the flows.

pub mod persistence;
pub mod random;
pub mod transport;
pub mod url;

pub use persistence::*;
pub use random::*;
pub use transport::*;
pub use self::url::*;
