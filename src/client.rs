//! Platform Client
//!
//! Entry point combining configuration, the HTTP envelope and the OAuth2
//! flows.

use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::core::{
    create_persistent_data_store, create_random_generator, HttpMethod, HttpTransport, Params,
    PersistentDataStore, RandomStringGenerator, ReqwestHttpTransport,
};
use crate::error::{ConfigurationError, SdkResult};
use crate::flows::{OAuth2Client, RedirectLoginHelper};
use crate::http::{ApiHttpClient, ApiRequest, ApiResponse};
use crate::telemetry::redact_token;
use crate::types::{AccessToken, FileUpload, SdkConfig};

/// Client for the platform API.
pub struct PlatformClient {
    config: SdkConfig,
    http: Arc<ApiHttpClient>,
    oauth2: Arc<OAuth2Client>,
    persistence: Arc<dyn PersistentDataStore>,
    random: Arc<dyn RandomStringGenerator>,
    default_access_token: Mutex<Option<AccessToken>>,
    last_response: Mutex<Option<ApiResponse>>,
}

impl PlatformClient {
    /// Create a client over the default reqwest transport.
    pub fn new(config: SdkConfig) -> SdkResult<Self> {
        let transport = Arc::new(ReqwestHttpTransport::new()?);
        Self::with_transport(config, transport)
    }

    /// Create a client over a custom transport.
    pub fn with_transport(config: SdkConfig, transport: Arc<dyn HttpTransport>) -> SdkResult<Self> {
        if config.app.id().is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "app_id".to_string(),
            }
            .into());
        }
        if config.app.secret().is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "app_secret".to_string(),
            }
            .into());
        }

        let persistence = create_persistent_data_store(&config.persistent_data_handler);
        let random = create_random_generator(&config.random_generator)?;

        let http = Arc::new(
            ApiHttpClient::new(transport, config.base_url.clone())
                .with_timeouts(config.timeout, config.upload_timeout),
        );
        let oauth2 = Arc::new(OAuth2Client::new(&config, http.clone()));

        debug!(
            app_id = config.app.id(),
            base_url = %config.base_url,
            "platform client created"
        );

        Ok(Self {
            default_access_token: Mutex::new(config.default_access_token.clone()),
            config,
            http,
            oauth2,
            persistence,
            random,
            last_response: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// The OAuth2 client sharing this client's transport.
    pub fn oauth2_client(&self) -> Arc<OAuth2Client> {
        self.oauth2.clone()
    }

    /// A redirect login helper over the configured persistence and random
    /// generator.
    pub fn redirect_login_helper(&self) -> RedirectLoginHelper {
        RedirectLoginHelper::new(
            self.oauth2.clone(),
            self.persistence.clone(),
            self.random.clone(),
        )
    }

    pub fn default_access_token(&self) -> Option<AccessToken> {
        self.default_access_token.lock().unwrap().clone()
    }

    /// Token used by calls that do not supply one.
    pub fn set_default_access_token(&self, token: AccessToken) {
        debug!(token = %redact_token(token.value()), "default access token set");
        *self.default_access_token.lock().unwrap() = Some(token);
    }

    /// The response to the last request sent, including API errors.
    pub fn last_response(&self) -> Option<ApiResponse> {
        self.last_response.lock().unwrap().clone()
    }

    /// Read a local file for upload.
    pub async fn file_to_upload(&self, path: impl AsRef<Path>) -> SdkResult<FileUpload> {
        FileUpload::open(path).await
    }

    /// Build a request without sending it.
    ///
    /// Falls back to the default access token when `access_token` is `None`.
    pub fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: Params,
        access_token: Option<AccessToken>,
    ) -> SdkResult<ApiRequest> {
        self.request_with_files(method, endpoint, params, Vec::new(), access_token)
    }

    fn request_with_files(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: Params,
        files: Vec<(String, FileUpload)>,
        access_token: Option<AccessToken>,
    ) -> SdkResult<ApiRequest> {
        let access_token = access_token.or_else(|| self.default_access_token());
        let mut builder = ApiRequest::builder(self.config.app.clone())
            .method(method)
            .endpoint(endpoint)
            .maybe_access_token(access_token)
            .params(params);
        for (name, file) in files {
            builder = builder.file(name, file);
        }
        builder.build()
    }

    /// Send a built request. The request must carry an access token.
    pub async fn send_request(&self, request: &ApiRequest) -> SdkResult<ApiResponse> {
        request.validate_access_token()?;

        let response = self.http.execute(request).await?;
        *self.last_response.lock().unwrap() = Some(response.clone());
        response.into_result()
    }

    async fn send(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: Params,
        access_token: Option<AccessToken>,
    ) -> SdkResult<ApiResponse> {
        let request = self.request(method, endpoint, params, access_token)?;
        self.send_request(&request).await
    }

    pub async fn get(&self, endpoint: &str, access_token: Option<AccessToken>) -> SdkResult<ApiResponse> {
        self.send(HttpMethod::Get, endpoint, Params::new(), access_token)
            .await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        params: Params,
        access_token: Option<AccessToken>,
    ) -> SdkResult<ApiResponse> {
        self.send(HttpMethod::Post, endpoint, params, access_token)
            .await
    }

    pub async fn put(
        &self,
        endpoint: &str,
        params: Params,
        access_token: Option<AccessToken>,
    ) -> SdkResult<ApiResponse> {
        self.send(HttpMethod::Put, endpoint, params, access_token)
            .await
    }

    pub async fn delete(
        &self,
        endpoint: &str,
        params: Params,
        access_token: Option<AccessToken>,
    ) -> SdkResult<ApiResponse> {
        self.send(HttpMethod::Delete, endpoint, params, access_token)
            .await
    }

    /// POST a multipart request with files attached.
    pub async fn upload(
        &self,
        endpoint: &str,
        params: Params,
        files: Vec<(String, FileUpload)>,
        access_token: Option<AccessToken>,
    ) -> SdkResult<ApiResponse> {
        let request =
            self.request_with_files(HttpMethod::Post, endpoint, params, files, access_token)?;
        self.send_request(&request).await
    }
}

/// Create a client over the default transport.
pub fn platform_client(config: SdkConfig) -> SdkResult<PlatformClient> {
    PlatformClient::new(config)
}
