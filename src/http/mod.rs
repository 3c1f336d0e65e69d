//! HTTP Envelope
//!
//! Request construction, body encoding and response decoding.

pub mod body;
pub mod client;
pub mod request;
pub mod response;

pub use body::*;
pub use client::*;
pub use request::{default_headers, ApiRequest, ApiRequestBuilder};
pub use response::*;
