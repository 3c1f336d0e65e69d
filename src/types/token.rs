//! Token Types
//!
//! Access tokens and the app identity they are issued to.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::str::FromStr;

use crate::error::{ConfigurationError, SdkError};

/// Tokens expiring later than this from now are long-lived.
const LONG_LIVED_THRESHOLD_HOURS: i64 = 2;

/// Compute the hex HMAC-SHA256 of `value` keyed by `secret`.
pub fn hmac_sha256_hex(value: &str, secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(value.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Client id/secret pair identifying the calling application.
#[derive(Clone)]
pub struct AppIdentity {
    id: String,
    secret: SecretString,
}

impl AppIdentity {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: SecretString::new(secret.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    /// App access token, `id|secret`. Never expires.
    pub fn access_token(&self) -> AccessToken {
        AccessToken::new(self.serialize(), None)
    }

    /// Serialize as `id|secret`.
    pub fn serialize(&self) -> String {
        format!("{}|{}", self.id, self.secret.expose_secret())
    }
}

impl FromStr for AppIdentity {
    type Err = SdkError;

    /// Parse the `id|secret` form produced by [`AppIdentity::serialize`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('|') {
            Some((id, secret)) if !id.is_empty() && !secret.is_empty() => {
                Ok(Self::new(id, secret))
            }
            _ => Err(ConfigurationError::InvalidConfig {
                message: "app identity must have the form id|secret".to_string(),
            }
            .into()),
        }
    }
}

impl PartialEq for AppIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.secret.expose_secret() == other.secret.expose_secret()
    }
}

impl std::fmt::Debug for AppIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppIdentity")
            .field("id", &self.id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Access token wrapper for safe handling.
#[derive(Clone)]
pub struct AccessToken {
    /// Token value (secret).
    value: SecretString,
    /// Expiration time.
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Create new access token.
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: SecretString::new(value.into()),
            expires_at,
        }
    }

    /// Create from a unix timestamp; `0` means no expiry.
    pub fn from_timestamp(value: impl Into<String>, expires_at: i64) -> Self {
        let expires_at = if expires_at == 0 {
            None
        } else {
            Utc.timestamp_opt(expires_at, 0).single()
        };
        Self::new(value, expires_at)
    }

    /// Get token value.
    pub fn value(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// App tokens have the form `id|secret`.
    pub fn is_app_access_token(&self) -> bool {
        self.value().contains('|')
    }

    /// Check if token is long-lived.
    pub fn is_long_lived(&self) -> bool {
        self.is_long_lived_at(Utc::now())
    }

    /// Check if token is long-lived relative to `now`.
    ///
    /// Without a known expiry only app tokens count as long-lived.
    pub fn is_long_lived_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => exp > now + Duration::hours(LONG_LIVED_THRESHOLD_HOURS),
            None => self.is_app_access_token(),
        }
    }

    /// Check if token is expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check if token is expired relative to `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp < now).unwrap_or(false)
    }

    /// Secret proof for this token: hex HMAC-SHA256 keyed by the app secret.
    pub fn app_secret_proof(&self, app_secret: &str) -> String {
        hmac_sha256_hex(self.value(), app_secret)
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value() && self.expires_at == other.expires_at
    }
}

impl Eq for AccessToken {}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
