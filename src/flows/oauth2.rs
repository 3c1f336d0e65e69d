//! OAuth2 Client
//!
//! Authorization URLs, code exchange, long-lived token exchange, client codes
//! and token inspection.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

use crate::core::{build_query_with_separator, HttpMethod, Params};
use crate::error::{SdkError, SdkResult, ValidationError};
use crate::http::{ApiHttpClient, ApiRequest, ApiResponse};
use crate::telemetry::redact_token;
use crate::types::{AccessToken, AccessTokenMetadata, AppIdentity, EndpointConfig, SdkConfig, SDK_VERSION_TAG};

/// OAuth2 operations interface.
#[async_trait]
pub trait OAuth2Flow: Send + Sync {
    /// Build the URL of the authorization dialog.
    ///
    /// `separator` joins the query arguments.
    fn authorization_url(
        &self,
        redirect_url: &str,
        state: &str,
        scopes: &[&str],
        extra_params: &Params,
        separator: &str,
    ) -> String;

    /// Exchange an authorization code for an access token.
    async fn access_token_from_code(&self, code: &str, redirect_uri: &str) -> SdkResult<AccessToken>;

    /// Exchange a short-lived token for a long-lived one.
    async fn long_lived_access_token(&self, token: &AccessToken) -> SdkResult<AccessToken>;

    /// Get a client code for a long-lived token.
    async fn code_from_long_lived_access_token(
        &self,
        token: &AccessToken,
        redirect_uri: &str,
    ) -> SdkResult<String>;

    /// Inspect a token.
    async fn debug_token(&self, token: &AccessToken) -> SdkResult<AccessTokenMetadata>;
}

/// OAuth2 client implementation.
pub struct OAuth2Client {
    app: AppIdentity,
    client: Arc<ApiHttpClient>,
    authorize_url: String,
    endpoints: EndpointConfig,
    scope_separator: String,
    last_request: Mutex<Option<ApiRequest>>,
}

impl OAuth2Client {
    /// Create a client from SDK configuration.
    pub fn new(config: &SdkConfig, client: Arc<ApiHttpClient>) -> Self {
        Self {
            app: config.app.clone(),
            client,
            authorize_url: config.authorize_url(),
            endpoints: config.endpoints.clone(),
            scope_separator: config.scope_separator.clone(),
            last_request: Mutex::new(None),
        }
    }

    /// The last request sent, for debugging.
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.last_request.lock().unwrap().clone()
    }

    fn client_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("client_id".to_string(), Value::from(self.app.id()));
        params.insert("client_secret".to_string(), Value::from(self.app.secret()));
        params
    }

    async fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: Params,
        access_token: Option<AccessToken>,
    ) -> SdkResult<ApiResponse> {
        let request = ApiRequest::builder(self.app.clone())
            .method(method)
            .endpoint(endpoint)
            .maybe_access_token(access_token)
            .params(params)
            .build()?;

        *self.last_request.lock().unwrap() = Some(request.clone());
        self.client.send_request(&request).await
    }

    /// POST with the client credentials merged into `params`.
    async fn send_with_client_params(
        &self,
        endpoint: &str,
        mut params: Params,
        access_token: Option<AccessToken>,
    ) -> SdkResult<ApiResponse> {
        for (key, value) in self.client_params() {
            params.entry(key).or_insert(value);
        }
        self.send(HttpMethod::Post, endpoint, params, access_token)
            .await
    }

    async fn request_access_token(&self, endpoint: &str, params: Params) -> SdkResult<AccessToken> {
        let response = self.send_with_client_params(endpoint, params, None).await?;
        access_token_from_body(response.decoded_body())
    }
}

/// Read `access_token` and its expiry from a token response body.
///
/// Expiry comes from `expires` or `expires_in`, in seconds from now.
fn access_token_from_body(data: &Value) -> SdkResult<AccessToken> {
    let value = data
        .get("access_token")
        .and_then(string_value)
        .ok_or(ValidationError::TokenNotReturned)?;

    let expires_in = data
        .get("expires")
        .or_else(|| data.get("expires_in"))
        .and_then(integer_value)
        .filter(|secs| *secs != 0);

    let expires_at = match expires_in {
        Some(secs) => Some(
            Duration::try_seconds(secs)
                .and_then(|delta| Utc::now().checked_add_signed(delta))
                .ok_or_else(|| ValidationError::UnexpectedResponse {
                    message: format!("access token expiry out of range: {}", secs),
                })?,
        ),
        None => None,
    };
    Ok(AccessToken::new(value, expires_at))
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl OAuth2Flow for OAuth2Client {
    fn authorization_url(
        &self,
        redirect_url: &str,
        state: &str,
        scopes: &[&str],
        extra_params: &Params,
        separator: &str,
    ) -> String {
        let mut params = Params::new();
        params.insert("client_id".to_string(), Value::from(self.app.id()));
        params.insert("state".to_string(), Value::from(state));
        params.insert("response_type".to_string(), Value::from("code"));
        params.insert("redirect_uri".to_string(), Value::from(redirect_url));
        params.insert(
            "scope".to_string(),
            Value::from(scopes.join(self.scope_separator.as_str())),
        );
        params.insert("sdk".to_string(), Value::from(SDK_VERSION_TAG));

        for (key, value) in extra_params {
            params.entry(key.clone()).or_insert_with(|| value.clone());
        }

        format!(
            "{}?{}",
            self.authorize_url,
            build_query_with_separator(&params, separator)
        )
    }

    #[instrument(skip(self, code))]
    async fn access_token_from_code(&self, code: &str, redirect_uri: &str) -> SdkResult<AccessToken> {
        let mut params = Params::new();
        params.insert("code".to_string(), Value::from(code));
        params.insert("redirect_uri".to_string(), Value::from(redirect_uri));
        params.insert("grant_type".to_string(), Value::from("authorization_code"));

        let token = self.request_access_token(&self.endpoints.token, params).await?;
        debug!(
            token = %redact_token(token.value()),
            expires_at = ?token.expires_at(),
            "exchanged code for access token"
        );
        Ok(token)
    }

    #[instrument(skip(self, token))]
    async fn long_lived_access_token(&self, token: &AccessToken) -> SdkResult<AccessToken> {
        let mut params = Params::new();
        params.insert("grant_type".to_string(), Value::from("exchange_token"));
        params.insert("exchange_token".to_string(), Value::from(token.value()));

        self.request_access_token(&self.endpoints.long_lived_token, params)
            .await
    }

    #[instrument(skip(self, token))]
    async fn code_from_long_lived_access_token(
        &self,
        token: &AccessToken,
        redirect_uri: &str,
    ) -> SdkResult<String> {
        let mut params = Params::new();
        params.insert("redirect_uri".to_string(), Value::from(redirect_uri));

        let response = self
            .send_with_client_params(&self.endpoints.client_code, params, Some(token.clone()))
            .await?;

        response
            .decoded_body()
            .get("code")
            .and_then(string_value)
            .ok_or_else(|| ValidationError::CodeNotReturned.into())
    }

    #[instrument(skip(self, token))]
    async fn debug_token(&self, token: &AccessToken) -> SdkResult<AccessTokenMetadata> {
        let mut params = Params::new();
        params.insert("input_token".to_string(), Value::from(token.value()));

        let response = self
            .send(
                HttpMethod::Get,
                &self.endpoints.debug_token,
                params,
                Some(self.app.access_token()),
            )
            .await?;

        AccessTokenMetadata::from_response(response.decoded_body())
    }
}

/// Mock OAuth2 flow for testing.
#[derive(Default)]
pub struct MockOAuth2Flow {
    code_exchange_history: Mutex<Vec<(String, String)>>,
    next_access_token: Mutex<Option<AccessToken>>,
    next_error: Mutex<Option<SdkError>>,
}

impl MockOAuth2Flow {
    /// Create new mock flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token returned by the next exchange.
    pub fn set_next_access_token(&self, token: AccessToken) -> &Self {
        *self.next_access_token.lock().unwrap() = Some(token);
        self
    }

    /// Set next error.
    pub fn set_next_error(&self, error: SdkError) -> &Self {
        *self.next_error.lock().unwrap() = Some(error);
        self
    }

    /// `(code, redirect_uri)` pairs exchanged so far.
    pub fn get_code_exchange_history(&self) -> Vec<(String, String)> {
        self.code_exchange_history.lock().unwrap().clone()
    }

    fn next_token(&self) -> SdkResult<AccessToken> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self
            .next_access_token
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| AccessToken::new("mock-access-token", None)))
    }
}

#[async_trait]
impl OAuth2Flow for MockOAuth2Flow {
    fn authorization_url(
        &self,
        redirect_url: &str,
        state: &str,
        scopes: &[&str],
        extra_params: &Params,
        separator: &str,
    ) -> String {
        let mut params = Params::new();
        params.insert("redirect_uri".to_string(), Value::from(redirect_url));
        params.insert("state".to_string(), Value::from(state));
        params.insert("scope".to_string(), Value::from(scopes.join(" ")));
        for (key, value) in extra_params {
            params.entry(key.clone()).or_insert_with(|| value.clone());
        }
        format!(
            "https://mock.example.com/authorize?{}",
            build_query_with_separator(&params, separator)
        )
    }

    async fn access_token_from_code(&self, code: &str, redirect_uri: &str) -> SdkResult<AccessToken> {
        self.code_exchange_history
            .lock()
            .unwrap()
            .push((code.to_string(), redirect_uri.to_string()));
        self.next_token()
    }

    async fn long_lived_access_token(&self, _token: &AccessToken) -> SdkResult<AccessToken> {
        self.next_token()
    }

    async fn code_from_long_lived_access_token(
        &self,
        _token: &AccessToken,
        _redirect_uri: &str,
    ) -> SdkResult<String> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok("mock-code".to_string())
    }

    async fn debug_token(&self, token: &AccessToken) -> SdkResult<AccessTokenMetadata> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        AccessTokenMetadata::from_response(&serde_json::json!({
            "data": {"is_valid": !token.value().is_empty()}
        }))
    }
}
