//! Configuration Types
//!
//! SDK configuration and platform endpoint defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{PersistentDataHandler, RandomGenerator};
use crate::types::{AccessToken, AppIdentity};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api-v2.fattureincloud.it";

/// Default base URL for the authorization dialog.
pub const DEFAULT_AUTHORIZATION_BASE_URL: &str = "https://api-v2.fattureincloud.it";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for requests carrying files.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// SDK version tag sent with authorization URLs.
pub const SDK_VERSION_TAG: &str = concat!("rust-sdk-", env!("CARGO_PKG_VERSION"));

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("platform-api-client-rust/", env!("CARGO_PKG_VERSION"));

/// OAuth endpoint paths, relative to the API base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Authorization code exchange.
    pub token: String,
    /// Long-lived token exchange.
    pub long_lived_token: String,
    /// Client code from a long-lived token.
    pub client_code: String,
    /// Token inspection.
    pub debug_token: String,
    /// Authorization dialog, relative to the authorization base URL.
    pub authorize: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            token: "/oauth/token".to_string(),
            long_lived_token: "/oauth/access_token".to_string(),
            client_code: "/oauth/client_code".to_string(),
            debug_token: "/debug_token".to_string(),
            authorize: "/oauth/authorize".to_string(),
        }
    }
}

/// SDK configuration.
#[derive(Clone, Debug)]
pub struct SdkConfig {
    /// Application identity.
    pub app: AppIdentity,
    /// Token used when a call does not supply one.
    pub default_access_token: Option<AccessToken>,
    /// API base URL.
    pub base_url: String,
    /// Authorization dialog base URL.
    pub authorization_base_url: String,
    /// OAuth endpoint paths.
    pub endpoints: EndpointConfig,
    /// HTTP timeout.
    pub timeout: Duration,
    /// HTTP timeout for requests with files attached.
    pub upload_timeout: Duration,
    /// Separator used to join scopes.
    pub scope_separator: String,
    /// Persistent data implementation.
    pub persistent_data_handler: PersistentDataHandler,
    /// Random string generator implementation.
    pub random_generator: RandomGenerator,
}

impl SdkConfig {
    /// Configuration with defaults for everything but the app identity.
    pub fn new(app: AppIdentity) -> Self {
        Self {
            app,
            default_access_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            authorization_base_url: DEFAULT_AUTHORIZATION_BASE_URL.to_string(),
            endpoints: EndpointConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            scope_separator: " ".to_string(),
            persistent_data_handler: PersistentDataHandler::default(),
            random_generator: RandomGenerator::default(),
        }
    }

    /// Full authorization dialog URL.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}{}",
            self.authorization_base_url.trim_end_matches('/'),
            self.endpoints.authorize
        )
    }
}
