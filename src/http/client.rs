//! API HTTP Client
//!
//! Prepares, sends and decodes [`ApiRequest`]s over an [`HttpTransport`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::{HttpTransport, TransportRequest};
use crate::error::SdkResult;
use crate::http::request::{default_headers, set_header};
use crate::http::{ApiRequest, ApiResponse};
use crate::types::{DEFAULT_TIMEOUT, DEFAULT_UPLOAD_TIMEOUT};

/// Sends requests to the API.
pub struct ApiHttpClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    timeout: Duration,
    upload_timeout: Duration,
    request_count: AtomicU64,
}

impl ApiHttpClient {
    /// Create a client with default timeouts.
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            request_count: AtomicU64::new(0),
        }
    }

    /// Set the request and upload timeouts.
    pub fn with_timeouts(mut self, timeout: Duration, upload_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.upload_timeout = upload_timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of requests sent by this client.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Build the transport request without sending it.
    ///
    /// Caller headers win over the defaults and the body content type.
    pub fn prepare_request(&self, request: &ApiRequest) -> SdkResult<TransportRequest> {
        let url = format!("{}{}", self.base_url, request.url());
        let body = request.body()?;

        let mut headers = default_headers();
        let body = body.map(|encoded| {
            set_header(
                &mut headers,
                "Content-Type".to_string(),
                encoded.content_type,
            );
            encoded.bytes
        });
        for (name, value) in request.headers() {
            set_header(&mut headers, name.clone(), value.clone());
        }

        let timeout = if request.contains_file_uploads() {
            self.upload_timeout
        } else {
            self.timeout
        };

        Ok(TransportRequest {
            method: request.method(),
            url,
            headers: headers.into_iter().collect(),
            body,
            timeout,
        })
    }

    /// Send a request. API errors in the response are returned as `Err`.
    pub async fn send_request(&self, request: &ApiRequest) -> SdkResult<ApiResponse> {
        self.execute(request).await?.into_result()
    }

    /// Send a request and decode the response, API error or not.
    #[instrument(skip(self, request), fields(method = %request.method(), endpoint = %request.endpoint()))]
    pub async fn execute(&self, request: &ApiRequest) -> SdkResult<ApiResponse> {
        let prepared = self.prepare_request(request)?;
        let count = self.request_count.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(request_count = count, "sending API request");

        let raw = self.transport.send(prepared).await?;
        let response = ApiResponse::new(request.clone(), raw);

        if let Some(error) = response.error() {
            warn!(
                kind = %error.kind,
                code = error.code,
                subcode = error.subcode,
                status = error.http_status,
                "API returned an error"
            );
        }

        Ok(response)
    }
}
