//! SDK Error Types
//!
//! Four error categories: local configuration problems, local validation
//! failures, classified API errors and transport failures.

mod api;

pub use api::{classify, ApiError, ApiErrorKind, UNKNOWN_ERROR_MESSAGE};

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Root error type for the SDK.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl SdkError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "SDK_CONFIG",
            Self::Validation(_) => "SDK_VALIDATION",
            Self::Api(e) => match e.kind {
                ApiErrorKind::Authentication => "SDK_API_AUTHENTICATION",
                ApiErrorKind::Authorization => "SDK_API_AUTHORIZATION",
                ApiErrorKind::Server => "SDK_API_SERVER",
                ApiErrorKind::Throttle => "SDK_API_THROTTLE",
                ApiErrorKind::Client => "SDK_API_CLIENT",
                ApiErrorKind::ResumableUpload { .. } => "SDK_API_RESUMABLE_UPLOAD",
                ApiErrorKind::Other => "SDK_API_OTHER",
            },
            Self::Network(_) => "SDK_NETWORK",
        }
    }

    /// Check if a caller may reasonably retry the same call.
    ///
    /// The SDK never retries on its own; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Api(e) => matches!(e.kind, ApiErrorKind::Throttle | ApiErrorKind::Server),
            _ => false,
        }
    }

    /// Check if the caller should obtain a fresh access token.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, Self::Api(e) if e.kind == ApiErrorKind::Authentication)
    }

    /// HTTP status of the response that produced this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Api(e) => Some(e.http_status),
            _ => None,
        }
    }

    /// The classified API error, if this is one.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Unable to find a cryptographically secure random source: {message}")]
    NoSecureRandomSource { message: String },

    #[error("Unknown persistent data handler: {name} (expected \"memory\")")]
    UnknownPersistentDataHandler { name: String },

    #[error("Unknown random string generator: {name} (expected \"os\" or \"thread\")")]
    UnknownRandomGenerator { name: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to create HTTP client: {message}")]
    HttpClient { message: String },
}

/// Reason a CSRF check on a login callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfFailure {
    /// The callback carried no `state` parameter.
    MissingCallbackState,
    /// No `state` was found in persistent data.
    MissingPersistedState,
    /// Both exist but differ.
    StateMismatch,
}

impl fmt::Display for CsrfFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCallbackState => write!(f, "required callback param \"state\" missing"),
            Self::MissingPersistedState => {
                write!(f, "required param \"state\" missing from persistent data")
            }
            Self::StateMismatch => {
                write!(f, "the \"state\" param from the callback and persistent data do not match")
            }
        }
    }
}

/// Local validation error. Never retried.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("HTTP method not specified")]
    MissingMethod,

    #[error("Invalid HTTP method specified: {method}")]
    InvalidMethod { method: String },

    #[error("You must provide an access token")]
    MissingAccessToken,

    #[error("Access token mismatch: the access token set on the request and the one found in the URL or params do not match")]
    TokenMismatch,

    #[error("Cross-site request forgery validation failed: {reason}")]
    CsrfMismatch { reason: CsrfFailure },

    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    #[error("Access token was not returned from API")]
    TokenNotReturned,

    #[error("Code was not returned from API")]
    CodeNotReturned,

    #[error("Access token metadata contains unexpected app ID: expected {expected}, got {actual:?}")]
    UnexpectedAppId {
        expected: String,
        actual: Option<String>,
    },

    #[error("Access token metadata contains unexpected user ID: expected {expected}, got {actual:?}")]
    UnexpectedUserId {
        expected: String,
        actual: Option<String>,
    },

    #[error("Inspection of access token metadata shows that the access token expired at {expired_at}")]
    AccessTokenExpired { expired_at: DateTime<Utc> },

    #[error("Unable to read file {path}: {message}")]
    FileUnreadable { path: String, message: String },

    #[error("Random string length must be at least 1, got {length}")]
    InvalidLength { length: usize },

    #[error("No redirect URL given and the callback URL is unknown")]
    MissingRedirectUrl,

    #[error("Invalid request params: {message}")]
    InvalidParams { message: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Failed to read response body: {message}")]
    BodyReadFailed { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    ///
    /// A failed body read means the server already processed the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }
}

/// Result type for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_is_retryable() {
        assert!(SdkError::Network(NetworkError::Timeout {
            timeout: Duration::from_secs(60)
        })
        .is_retryable());
        assert!(!SdkError::Network(NetworkError::BodyReadFailed {
            message: "reset".to_string()
        })
        .is_retryable());
        assert!(SdkError::Api(classify(&json!({"error": {"code": 4}}), 400)).is_retryable());
        assert!(SdkError::Api(classify(&json!({"error": {"code": 2}}), 500)).is_retryable());
        assert!(!SdkError::Validation(ValidationError::MissingAccessToken).is_retryable());
    }

    #[test]
    fn test_needs_reauth() {
        assert!(SdkError::Api(classify(&json!({"error": {"code": 190}}), 401)).needs_reauth());
        assert!(!SdkError::Api(classify(&json!({"error": {"code": 4}}), 400)).needs_reauth());
        assert!(!SdkError::Validation(ValidationError::TokenMismatch).needs_reauth());
    }

    #[test]
    fn test_http_status_and_error_code() {
        let error = SdkError::Api(classify(&json!({"error": {"code": 506}}), 400));
        assert_eq!(error.http_status(), Some(400));
        assert_eq!(error.error_code(), "SDK_API_CLIENT");

        let error = SdkError::Configuration(ConfigurationError::MissingRequired {
            field: "app_id".to_string(),
        });
        assert_eq!(error.http_status(), None);
        assert_eq!(error.error_code(), "SDK_CONFIG");
    }

    #[test]
    fn test_csrf_failure_message() {
        let error = ValidationError::CsrfMismatch {
            reason: CsrfFailure::MissingPersistedState,
        };
        assert!(error.to_string().contains("persistent data"));
    }
}
