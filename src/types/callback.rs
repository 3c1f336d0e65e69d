//! Callback Types
//!
//! Types for handling login redirect callbacks.

use serde::{Deserialize, Serialize};

use crate::core::params_as_map;

/// Callback parameters from the login redirect.
///
/// Deserializable from the callback query by web frameworks; `url` is then
/// absent unless set by the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackParams {
    /// Authorization code (if success).
    pub code: Option<String>,
    /// State parameter.
    pub state: Option<String>,
    /// Error (if the user denied or login failed).
    pub error: Option<String>,
    /// Numeric error code, as sent.
    pub error_code: Option<String>,
    /// Error reason.
    pub error_reason: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
    /// URL the callback was received on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CallbackParams {
    /// Parse callback parameters from the URL the host application received.
    pub fn from_url(url: &str) -> Self {
        let mut query = params_as_map(url);
        let mut take = |name: &str| query.remove(name).filter(|v| !v.is_empty());

        Self {
            code: take("code"),
            state: take("state"),
            error: take("error"),
            error_code: take("error_code"),
            error_reason: take("error_reason"),
            error_description: take("error_description"),
            url: Some(url.to_string()),
        }
    }

    /// Check if callback contains an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Check if callback is successful.
    pub fn is_success(&self) -> bool {
        self.code.is_some() && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_callback() {
        let params = CallbackParams::from_url("https://app.test/cb?code=abc&state=xyz");
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
        assert!(params.is_success());
        assert!(!params.is_error());
        assert_eq!(params.url.as_deref(), Some("https://app.test/cb?code=abc&state=xyz"));
    }

    #[test]
    fn test_error_callback() {
        let params = CallbackParams::from_url(
            "https://app.test/cb?error=access_denied&error_code=200&error_reason=user_denied&error_description=Permissions+error",
        );
        assert!(params.is_error());
        assert!(!params.is_success());
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.error_code.as_deref(), Some("200"));
        assert_eq!(params.error_reason.as_deref(), Some("user_denied"));
        assert_eq!(params.error_description.as_deref(), Some("Permissions error"));
    }

    #[test]
    fn test_empty_values_are_absent() {
        let params = CallbackParams::from_url("/cb?code=&state=s");
        assert_eq!(params.code, None);
        assert_eq!(params.state.as_deref(), Some("s"));
    }

    #[test]
    fn test_deserialize_from_query_map() {
        let params: CallbackParams =
            serde_json::from_value(serde_json::json!({"code": "abc", "state": "xyz"})).unwrap();
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
        assert_eq!(params.error, None);
        assert_eq!(params.url, None);
    }
}
