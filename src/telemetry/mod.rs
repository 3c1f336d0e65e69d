//! Telemetry
//!
//! Log redaction helpers. The library emits `tracing` events and never
//! installs a subscriber.

pub mod logging;

pub use logging::{redact_token, redact_url};
