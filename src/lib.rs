//! Platform API Client
//!
//! OAuth2-authenticated client for a REST API, with typed classification of
//! API errors.
//!
//! # Features
//!
//! - Authorization URL construction with CSRF-protected redirect login
//! - Authorization code, long-lived token and client code exchanges
//! - Token inspection through the debug-token endpoint
//! - `appsecret_proof` signing of every authenticated call
//! - URL-encoded, JSON and multipart request bodies
//! - Decoding of JSON, form-encoded and scalar response bodies
//! - Classification of API errors for retry and re-authentication decisions
//!
//! # Example
//!
//! ```rust,ignore
//! use platform_api_client::{sdk_config, CallbackParams, Params, PlatformClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = sdk_config()
//!         .app_id("my-app-id")
//!         .app_secret("my-app-secret")
//!         .build()?;
//!
//!     let client = PlatformClient::new(config)?;
//!     let helper = client.redirect_login_helper();
//!
//!     // Send the user here
//!     let login_url = helper.login_url("https://myapp.com/callback", &["read"], &Params::new())?;
//!     println!("Login: {}", login_url);
//!
//!     // Later, on the callback
//!     let callback = CallbackParams::from_url("https://myapp.com/callback?code=...&state=...");
//!     if let Some(token) = helper.complete_login(&callback, None).await? {
//!         client.set_default_access_token(token);
//!         let me = client.get("/me", None).await?;
//!         println!("{}", me.decoded_body());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: tokens, token metadata, uploads, callbacks and configuration
//! - `error`: error hierarchy and API error classification
//! - `core`: transport, persistence, random strings and URL utilities
//! - `http`: request envelope, body encoding and response decoding
//! - `flows`: OAuth2 client and redirect login
//! - `builders`: fluent configuration builder
//! - `client`: the `PlatformClient` facade

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod http;
pub mod telemetry;
pub mod types;

// Re-export main client
pub use client::{platform_client, PlatformClient};

// Re-export builders
pub use builders::{sdk_config, SdkConfigBuilder};

// Re-export errors
pub use error::{
    classify, ApiError, ApiErrorKind, ConfigurationError, CsrfFailure, NetworkError, SdkError,
    SdkResult, ValidationError,
};

// Re-export types
pub use types::{
    // Tokens
    AccessToken, AccessTokenMetadata, AppIdentity,
    // Config
    EndpointConfig, SdkConfig,
    // Callback
    CallbackParams,
    // Uploads
    FileUpload,
};

// Re-export core components
pub use crate::core::{
    // Transport
    HttpMethod, HttpTransport, MockHttpTransport, ReqwestHttpTransport, TransportRequest,
    TransportResponse,
    // Persistence
    InMemoryPersistentDataStore, PersistentDataHandler, PersistentDataStore,
    // Random
    MockRandomStringGenerator, OsRandomStringGenerator, RandomGenerator, RandomStringGenerator,
    ThreadRandomStringGenerator,
    // URL
    Params,
};

// Re-export HTTP envelope
pub use http::{ApiHttpClient, ApiRequest, ApiRequestBuilder, ApiResponse};

// Re-export flows
pub use flows::{MockOAuth2Flow, OAuth2Client, OAuth2Flow, RedirectLoginHelper};
