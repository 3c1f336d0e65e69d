//! Access Token Metadata
//!
//! The `data` object returned by the debug-token endpoint.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::{SdkError, ValidationError};

/// Inspection result for an access token.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessTokenMetadata {
    metadata: Map<String, Value>,
}

impl AccessTokenMetadata {
    /// Wrap a decoded debug-token body. Fails if `data` is absent.
    pub fn from_response(body: &Value) -> Result<Self, SdkError> {
        match body.get("data") {
            Some(Value::Object(data)) => Ok(Self {
                metadata: data.clone(),
            }),
            _ => Err(ValidationError::UnexpectedResponse {
                message: "unexpected debug token response data".to_string(),
            }
            .into()),
        }
    }

    /// Raw field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.metadata.get(name)
    }

    /// Raw value of `parent.name`.
    pub fn child_property(&self, parent: &str, name: &str) -> Option<&Value> {
        self.metadata.get(parent).and_then(|p| p.get(name))
    }

    pub fn app_id(&self) -> Option<String> {
        self.field("app_id").and_then(id_string)
    }

    pub fn application(&self) -> Option<&str> {
        self.field("application").and_then(Value::as_str)
    }

    pub fn user_id(&self) -> Option<String> {
        self.field("user_id").and_then(id_string)
    }

    pub fn profile_id(&self) -> Option<String> {
        self.field("profile_id").and_then(id_string)
    }

    pub fn is_valid(&self) -> Option<bool> {
        self.field("is_valid").and_then(Value::as_bool)
    }

    pub fn scopes(&self) -> Vec<String> {
        self.field("scopes")
            .and_then(Value::as_array)
            .map(|scopes| {
                scopes
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.field("expires_at").and_then(timestamp)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.field("issued_at").and_then(timestamp)
    }

    /// Whether the token inspection reported an error.
    pub fn is_error(&self) -> bool {
        self.field("error").is_some()
    }

    pub fn error_code(&self) -> Option<i64> {
        self.child_property("error", "code").and_then(Value::as_i64)
    }

    pub fn error_subcode(&self) -> Option<i64> {
        self.child_property("error", "subcode").and_then(Value::as_i64)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.child_property("error", "message").and_then(Value::as_str)
    }

    pub fn sso(&self) -> Option<&str> {
        self.child_property("metadata", "sso").and_then(Value::as_str)
    }

    pub fn auth_type(&self) -> Option<&str> {
        self.child_property("metadata", "auth_type")
            .and_then(Value::as_str)
    }

    pub fn auth_nonce(&self) -> Option<&str> {
        self.child_property("metadata", "auth_nonce")
            .and_then(Value::as_str)
    }

    /// Ensure the token was issued to `app_id`.
    pub fn validate_app_id(&self, app_id: &str) -> Result<(), SdkError> {
        let actual = self.app_id();
        if actual.as_deref() != Some(app_id) {
            return Err(ValidationError::UnexpectedAppId {
                expected: app_id.to_string(),
                actual,
            }
            .into());
        }
        Ok(())
    }

    /// Ensure the token belongs to `user_id`.
    pub fn validate_user_id(&self, user_id: &str) -> Result<(), SdkError> {
        let actual = self.user_id();
        if actual.as_deref() != Some(user_id) {
            return Err(ValidationError::UnexpectedUserId {
                expected: user_id.to_string(),
                actual,
            }
            .into());
        }
        Ok(())
    }

    /// Ensure the token has not expired. Tokens without expiry pass.
    pub fn validate_expiration(&self) -> Result<(), SdkError> {
        self.validate_expiration_at(Utc::now())
    }

    pub fn validate_expiration_at(&self, now: DateTime<Utc>) -> Result<(), SdkError> {
        match self.expires_at() {
            Some(expired_at) if expired_at < now => {
                Err(ValidationError::AccessTokenExpired { expired_at }.into())
            }
            _ => Ok(()),
        }
    }
}

/// Ids may be JSON strings or numbers.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Unix seconds; `0` means absent.
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value.as_i64()? {
        0 => None,
        secs => Utc.timestamp_opt(secs, 0).single(),
    }
}
