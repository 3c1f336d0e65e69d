//! API error classification.
//!
//! Maps a decoded error payload to one of a fixed set of categories. The code
//! and subcode lists are platform constants.

use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// Message used when the payload carries none.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error from API.";

/// Subcodes that require the user to log in again.
const REAUTHENTICATION_SUBCODES: &[i64] = &[458, 459, 460, 463, 464, 467];

/// Subcodes emitted by the resumable upload protocol.
const RESUMABLE_UPLOAD_SUBCODES: &[i64] = &[1363030, 1363019, 1363033, 1363021, 1363041];

/// Resumable upload subcode that reports the byte range to resend.
const RESUMABLE_UPLOAD_OFFSETS_SUBCODE: i64 = 1363037;

/// Login status or token expired, revoked, or invalid.
const AUTHENTICATION_CODES: &[i64] = &[100, 102, 190];

/// Server issue, possible downtime.
const SERVER_CODES: &[i64] = &[1, 2];

/// API throttling.
const THROTTLE_CODES: &[i64] = &[4, 17, 32, 341, 613];

/// Duplicate post.
const DUPLICATE_POST_CODE: i64 = 506;

/// Missing permission; codes 200..=299 are permission errors too.
const MISSING_PERMISSION_CODE: i64 = 10;

const OAUTH_EXCEPTION_TYPE: &str = "OAuthException";

/// API error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Token expired, revoked or invalid; the caller should re-authenticate.
    Authentication,
    /// Missing permissions.
    Authorization,
    /// Server-side failure.
    Server,
    /// Request was throttled.
    Throttle,
    /// Client mistake, e.g. a duplicate post.
    Client,
    /// Resumable upload failure, with the byte range to resend when known.
    ResumableUpload {
        start_offset: Option<i64>,
        end_offset: Option<i64>,
    },
    /// Anything else.
    Other,
}

impl ApiErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Server => "server",
            Self::Throttle => "throttle",
            Self::Client => "client",
            Self::ResumableUpload { .. } => "resumable_upload",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified error returned by the API.
#[derive(Error, Clone, Debug, PartialEq)]
#[error("{kind} error: {message} (code {code}, subcode {subcode}, HTTP {http_status})")]
pub struct ApiError {
    /// Category.
    pub kind: ApiErrorKind,
    /// Error message from the payload.
    pub message: String,
    /// Numeric error code, -1 when absent.
    pub code: i64,
    /// Numeric error subcode, -1 when absent.
    pub subcode: i64,
    /// Error type string, empty when absent.
    pub error_type: String,
    /// HTTP status of the response.
    pub http_status: u16,
    /// Full decoded response body.
    pub response_data: Value,
}

impl ApiError {
    /// Start offset to resume an upload from, if reported.
    pub fn start_offset(&self) -> Option<i64> {
        match self.kind {
            ApiErrorKind::ResumableUpload { start_offset, .. } => start_offset,
            _ => None,
        }
    }

    /// End offset of the chunk to resend, if reported.
    pub fn end_offset(&self) -> Option<i64> {
        match self.kind {
            ApiErrorKind::ResumableUpload { end_offset, .. } => end_offset,
            _ => None,
        }
    }
}

/// Classify a decoded response body carrying an error.
pub fn classify(decoded: &Value, http_status: u16) -> ApiError {
    let normalized = normalize_error_payload(decoded);
    let error = normalized.get("error");
    let field = |name: &str| error.and_then(|e| e.get(name));

    let code = field("code").and_then(as_i64);
    let subcode = field("error_subcode").and_then(as_i64);
    let message = field("message")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_ERROR_MESSAGE)
        .to_string();
    let error_type = field("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let kind = classify_kind(code, subcode, &error_type, error);

    ApiError {
        kind,
        message,
        code: code.unwrap_or(-1),
        subcode: subcode.unwrap_or(-1),
        error_type,
        http_status,
        response_data: decoded.clone(),
    }
}

/// Some endpoints return the error object at the top level.
fn normalize_error_payload(decoded: &Value) -> Value {
    let nested_code = decoded
        .get("error")
        .and_then(|e| e.get("code"))
        .is_some();
    if !nested_code && decoded.get("code").is_some() {
        return json!({ "error": decoded });
    }
    decoded.clone()
}

fn classify_kind(
    code: Option<i64>,
    subcode: Option<i64>,
    error_type: &str,
    error: Option<&Value>,
) -> ApiErrorKind {
    if let Some(subcode) = subcode {
        if REAUTHENTICATION_SUBCODES.contains(&subcode) {
            return ApiErrorKind::Authentication;
        }
        if RESUMABLE_UPLOAD_SUBCODES.contains(&subcode) {
            return ApiErrorKind::ResumableUpload {
                start_offset: None,
                end_offset: None,
            };
        }
        if subcode == RESUMABLE_UPLOAD_OFFSETS_SUBCODE {
            let data = error.and_then(|e| e.get("error_data"));
            let offset = |name: &str| data.and_then(|d| d.get(name)).and_then(as_i64);
            return ApiErrorKind::ResumableUpload {
                start_offset: offset("start_offset"),
                end_offset: offset("end_offset"),
            };
        }
    }

    if let Some(code) = code {
        if AUTHENTICATION_CODES.contains(&code) {
            return ApiErrorKind::Authentication;
        }
        if SERVER_CODES.contains(&code) {
            return ApiErrorKind::Server;
        }
        if THROTTLE_CODES.contains(&code) {
            return ApiErrorKind::Throttle;
        }
        if code == DUPLICATE_POST_CODE {
            return ApiErrorKind::Client;
        }
        if code == MISSING_PERMISSION_CODE || (200..=299).contains(&code) {
            return ApiErrorKind::Authorization;
        }
    }

    if error_type == OAUTH_EXCEPTION_TYPE {
        return ApiErrorKind::Authentication;
    }

    ApiErrorKind::Other
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
