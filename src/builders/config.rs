//! Configuration Builder
//!
//! Fluent builder for SDK configuration.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

use crate::core::{PersistentDataHandler, RandomGenerator};
use crate::error::{ConfigurationError, SdkError, SdkResult};
use crate::types::{
    AccessToken, AppIdentity, EndpointConfig, SdkConfig, DEFAULT_AUTHORIZATION_BASE_URL,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_UPLOAD_TIMEOUT,
};

/// SDK configuration builder.
pub struct SdkConfigBuilder {
    app_id: Option<String>,
    app_secret: Option<SecretString>,
    default_access_token: Option<AccessToken>,
    base_url: String,
    authorization_base_url: String,
    endpoints: EndpointConfig,
    timeout: Duration,
    upload_timeout: Duration,
    scope_separator: String,
    persistent_data_handler: PersistentDataHandler,
    random_generator: RandomGenerator,
}

impl Default for SdkConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SdkConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            app_id: None,
            app_secret: None,
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

    /// Create a builder from `PLATFORM_*` environment variables.
    pub fn from_env() -> SdkResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create a builder from variables supplied by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SdkResult<Self> {
        let mut builder = Self::new();

        if let Some(id) = lookup("PLATFORM_APP_ID") {
            builder = builder.app_id(id);
        }
        if let Some(secret) = lookup("PLATFORM_APP_SECRET") {
            builder = builder.app_secret(secret);
        }
        if let Some(token) = lookup("PLATFORM_ACCESS_TOKEN") {
            builder = builder.default_access_token(token);
        }
        if let Some(url) = lookup("PLATFORM_BASE_URL") {
            builder = builder.base_url(&url)?;
        }
        if let Some(timeout) = lookup("PLATFORM_TIMEOUT") {
            let secs = timeout
                .parse::<u64>()
                .map_err(|_| ConfigurationError::InvalidConfig {
                    message: format!("PLATFORM_TIMEOUT must be whole seconds, got {:?}", timeout),
                })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(builder)
    }

    /// Set app ID.
    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Set app secret.
    pub fn app_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.app_secret = Some(SecretString::new(app_secret.into()));
        self
    }

    /// Set the access token used when a call does not supply one.
    pub fn default_access_token(mut self, token: impl Into<String>) -> Self {
        self.default_access_token = Some(AccessToken::new(token, None));
        self
    }

    /// Set the API base URL.
    pub fn base_url(mut self, url: &str) -> Result<Self, ConfigurationError> {
        self.base_url = validate_url(url)?;
        Ok(self)
    }

    /// Set the authorization dialog base URL.
    pub fn authorization_base_url(mut self, url: &str) -> Result<Self, ConfigurationError> {
        self.authorization_base_url = validate_url(url)?;
        Ok(self)
    }

    /// Set the code exchange endpoint path.
    pub fn token_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.token = path.into();
        self
    }

    /// Set the long-lived token exchange endpoint path.
    pub fn long_lived_token_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.long_lived_token = path.into();
        self
    }

    /// Set the client code endpoint path.
    pub fn client_code_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.client_code = path.into();
        self
    }

    /// Set the token inspection endpoint path.
    pub fn debug_token_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.debug_token = path.into();
        self
    }

    /// Set the authorization dialog path.
    pub fn authorize_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.authorize = path.into();
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout for requests with files attached.
    pub fn upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Set the separator used to join scopes.
    pub fn scope_separator(mut self, separator: impl Into<String>) -> Self {
        self.scope_separator = separator.into();
        self
    }

    pub fn persistent_data_handler(mut self, handler: PersistentDataHandler) -> Self {
        self.persistent_data_handler = handler;
        self
    }

    pub fn random_generator(mut self, generator: RandomGenerator) -> Self {
        self.random_generator = generator;
        self
    }

    /// Build the SDK configuration.
    pub fn build(self) -> Result<SdkConfig, SdkError> {
        let app_id = self
            .app_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigurationError::MissingRequired {
                field: "app_id".to_string(),
            })?;

        let app_secret = self
            .app_secret
            .as_ref()
            .map(|s| s.expose_secret().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigurationError::MissingRequired {
                field: "app_secret".to_string(),
            })?;

        Ok(self.into_config(AppIdentity::new(app_id, app_secret)))
    }

    /// Build the configuration without validation (for testing).
    pub fn build_unchecked(self) -> SdkConfig {
        let app = AppIdentity::new(
            self.app_id.clone().unwrap_or_default(),
            self.app_secret
                .as_ref()
                .map(|s| s.expose_secret().to_string())
                .unwrap_or_default(),
        );
        self.into_config(app)
    }

    fn into_config(self, app: AppIdentity) -> SdkConfig {
        SdkConfig {
            app,
            default_access_token: self.default_access_token,
            base_url: self.base_url,
            authorization_base_url: self.authorization_base_url,
            endpoints: self.endpoints,
            timeout: self.timeout,
            upload_timeout: self.upload_timeout,
            scope_separator: self.scope_separator,
            persistent_data_handler: self.persistent_data_handler,
            random_generator: self.random_generator,
        }
    }
}

fn validate_url(url: &str) -> Result<String, ConfigurationError> {
    Url::parse(url).map_err(|e| ConfigurationError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(url.trim_end_matches('/').to_string())
}

/// Create a new SDK configuration builder.
pub fn sdk_config() -> SdkConfigBuilder {
    SdkConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_builder_success() {
        let config = SdkConfigBuilder::new()
            .app_id("123")
            .app_secret("foo_secret")
            .default_access_token("user-token")
            .base_url("https://api.test/")
            .unwrap()
            .timeout(Duration::from_secs(5))
            .scope_separator(",")
            .build()
            .unwrap();

        assert_eq!(config.app.id(), "123");
        assert_eq!(config.app.secret(), "foo_secret");
        assert_eq!(config.base_url, "https://api.test");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.upload_timeout, Duration::from_secs(3600));
        assert_eq!(config.scope_separator, ",");
        assert_eq!(
            config.default_access_token.as_ref().map(|t| t.value()),
            Some("user-token")
        );
    }

    #[test]
    fn test_builder_missing_app_id() {
        let result = SdkConfigBuilder::new().app_secret("secret").build();
        assert!(matches!(
            result,
            Err(SdkError::Configuration(ConfigurationError::MissingRequired { ref field })) if field == "app_id"
        ));
    }

    #[test]
    fn test_builder_missing_app_secret() {
        let result = SdkConfigBuilder::new().app_id("123").app_secret("").build();
        assert!(matches!(
            result,
            Err(SdkError::Configuration(ConfigurationError::MissingRequired { ref field })) if field == "app_secret"
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            SdkConfigBuilder::new().base_url("not a url"),
            Err(ConfigurationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_build_unchecked() {
        let config = SdkConfigBuilder::new().build_unchecked();
        assert_eq!(config.app.id(), "");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("PLATFORM_APP_ID", "123"),
            ("PLATFORM_APP_SECRET", "foo_secret"),
            ("PLATFORM_ACCESS_TOKEN", "env-token"),
            ("PLATFORM_BASE_URL", "https://env.test"),
            ("PLATFORM_TIMEOUT", "15"),
        ]
        .into_iter()
        .collect();

        let config = SdkConfigBuilder::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.app.id(), "123");
        assert_eq!(config.base_url, "https://env.test");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(
            config.default_access_token.as_ref().map(|t| t.value()),
            Some("env-token")
        );
    }

    #[test]
    fn test_from_lookup_invalid_timeout() {
        let result = SdkConfigBuilder::from_lookup(|name| {
            (name == "PLATFORM_TIMEOUT").then(|| "soon".to_string())
        });
        assert!(matches!(
            result,
            Err(SdkError::Configuration(ConfigurationError::InvalidConfig { .. }))
        ));
    }
}
