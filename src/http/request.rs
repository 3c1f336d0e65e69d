//! API Request
//!
//! Immutable request envelope and its builder. `access_token` and
//! `appsecret_proof` are never stored as ordinary params; they are derived
//! when the request is serialized.

use serde_json::Value;

use crate::core::{append_params, force_slash_prefix, params_as_map, remove_params, HttpMethod, Params};
use crate::error::{SdkError, ValidationError};
use crate::http::body::{EncodedBody, JsonBody, MultipartBody, RequestBody};
use crate::types::{AccessToken, AppIdentity, FileUpload, USER_AGENT};

const ACCESS_TOKEN_PARAM: &str = "access_token";
const APP_SECRET_PROOF_PARAM: &str = "appsecret_proof";

/// Headers sent with every request.
pub fn default_headers() -> Vec<(String, String)> {
    vec![
        ("User-Agent".to_string(), USER_AGENT.to_string()),
        ("Accept-Encoding".to_string(), "*".to_string()),
    ]
}

/// Insert or replace a header, matching names case-insensitively.
pub(crate) fn set_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(&name))
    {
        Some(existing) => *existing = (name, value),
        None => headers.push((name, value)),
    }
}

/// A request to the API.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    app: AppIdentity,
    access_token: Option<AccessToken>,
    method: HttpMethod,
    endpoint: String,
    headers: Vec<(String, String)>,
    params: Params,
    files: Vec<(String, FileUpload)>,
}

impl ApiRequest {
    /// Start building a request for `app`.
    pub fn builder(app: AppIdentity) -> ApiRequestBuilder {
        ApiRequestBuilder::new(app)
    }

    pub fn app(&self) -> &AppIdentity {
        &self.app
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Endpoint with `access_token` and `appsecret_proof` removed.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Caller-supplied headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Params without the derived token params.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn files(&self) -> &[(String, FileUpload)] {
        &self.files
    }

    pub fn contains_file_uploads(&self) -> bool {
        !self.files.is_empty()
    }

    /// Secret proof for the access token, if there is one.
    pub fn app_secret_proof(&self) -> Option<String> {
        self.access_token
            .as_ref()
            .map(|token| token.app_secret_proof(self.app.secret()))
    }

    /// Params including `access_token` and `appsecret_proof` when a token is set.
    pub fn params_with_token(&self) -> Params {
        let mut params = self.params.clone();
        if let (Some(token), Some(proof)) = (&self.access_token, self.app_secret_proof()) {
            params.insert(
                ACCESS_TOKEN_PARAM.to_string(),
                Value::String(token.value().to_string()),
            );
            params.insert(APP_SECRET_PROOF_PARAM.to_string(), Value::String(proof));
        }
        params
    }

    /// Fail unless a non-empty access token is set.
    pub fn validate_access_token(&self) -> Result<(), SdkError> {
        match &self.access_token {
            Some(token) if !token.value().is_empty() => Ok(()),
            _ => Err(ValidationError::MissingAccessToken.into()),
        }
    }

    /// Relative URL. Methods without a body carry every param in the query.
    pub fn url(&self) -> String {
        let endpoint = force_slash_prefix(&self.endpoint);
        if self.method.carries_body() {
            endpoint
        } else {
            append_params(&endpoint, &self.params_with_token())
        }
    }

    /// Encode the body: multipart with files, JSON for POST/PUT, none otherwise.
    pub fn body(&self) -> Result<Option<EncodedBody>, SdkError> {
        let body_params = if self.method.carries_body() {
            self.params_with_token()
        } else {
            Params::new()
        };

        if self.contains_file_uploads() {
            let body = MultipartBody::new(body_params, self.files.clone(), None);
            return body.encode().map(Some);
        }

        if self.method.carries_body() {
            return JsonBody::new(body_params).encode().map(Some);
        }

        Ok(None)
    }
}

/// Builder for [`ApiRequest`].
pub struct ApiRequestBuilder {
    app: AppIdentity,
    access_token: Option<AccessToken>,
    method: Option<String>,
    endpoint: String,
    headers: Vec<(String, String)>,
    params: Params,
    files: Vec<(String, FileUpload)>,
    harvested_tokens: Vec<String>,
}

impl ApiRequestBuilder {
    fn new(app: AppIdentity) -> Self {
        Self {
            app,
            access_token: None,
            method: None,
            endpoint: String::new(),
            headers: Vec::new(),
            params: Params::new(),
            files: Vec::new(),
            harvested_tokens: Vec::new(),
        }
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method.as_str().to_string());
        self
    }

    /// Set the HTTP method by name; validated at build time.
    pub fn method_name(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the access token.
    pub fn access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    pub fn maybe_access_token(mut self, token: Option<AccessToken>) -> Self {
        self.access_token = token;
        self
    }

    /// Set the endpoint. A token in its query is harvested and stripped.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        if let Some(token) = params_as_map(&endpoint).remove(ACCESS_TOKEN_PARAM) {
            self.harvested_tokens.push(token);
        }
        self.endpoint = remove_params(&endpoint, &[ACCESS_TOKEN_PARAM, APP_SECRET_PROOF_PARAM]);
        self
    }

    /// Merge params. A token among them is harvested and stripped.
    pub fn params(mut self, params: Params) -> Self {
        for (key, value) in params {
            self = self.param(key, value);
        }
        self
    }

    /// Set one param.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            ACCESS_TOKEN_PARAM => {
                let token = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                self.harvested_tokens.push(token);
            }
            APP_SECRET_PROOF_PARAM => {}
            _ => {
                self.params.insert(key, value);
            }
        }
        self
    }

    /// Set a header; replaces one of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Attach a file under `name`.
    pub fn file(mut self, name: impl Into<String>, file: FileUpload) -> Self {
        self.files.push((name.into(), file));
        self
    }

    /// Build the request.
    pub fn build(self) -> Result<ApiRequest, SdkError> {
        let method = self
            .method
            .as_deref()
            .ok_or(ValidationError::MissingMethod)?
            .parse::<HttpMethod>()?;

        let mut access_token = self.access_token;
        for harvested in self.harvested_tokens {
            match &access_token {
                Some(existing) if existing.value().is_empty() => {
                    access_token = Some(AccessToken::new(harvested, None));
                }
                Some(existing) if existing.value() != harvested => {
                    return Err(ValidationError::TokenMismatch.into());
                }
                Some(_) => {}
                None => access_token = Some(AccessToken::new(harvested, None)),
            }
        }

        Ok(ApiRequest {
            app: self.app,
            access_token,
            method,
            endpoint: self.endpoint,
            headers: self.headers,
            params: self.params,
            files: self.files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn app() -> AppIdentity {
        AppIdentity::new("123", "foo_secret")
    }

    #[test]
    fn test_missing_and_invalid_method() {
        let result = ApiRequest::builder(app()).endpoint("/me").build();
        assert!(matches!(
            result,
            Err(SdkError::Validation(ValidationError::MissingMethod))
        ));

        let result = ApiRequest::builder(app())
            .method_name("PATCH")
            .endpoint("/me")
            .build();
        assert!(matches!(
            result,
            Err(SdkError::Validation(ValidationError::InvalidMethod { .. }))
        ));
    }

    #[test]
    fn test_token_harvested_from_endpoint() {
        let request = ApiRequest::builder(app())
            .method(HttpMethod::Get)
            .endpoint("/foo?access_token=foo_token&appsecret_proof=bar&a=1")
            .build()
            .unwrap();

        assert_eq!(request.access_token().map(|t| t.value()), Some("foo_token"));
        assert_eq!(request.endpoint(), "/foo?a=1");
    }

    #[test]
    fn test_token_harvested_from_params() {
        let request = ApiRequest::builder(app())
            .method(HttpMethod::Post)
            .endpoint("/foo")
            .params(json!({"access_token": "foo_token", "appsecret_proof": "x", "k": "v"})
                .as_object()
                .cloned()
                .unwrap())
            .build()
            .unwrap();

        assert_eq!(request.access_token().map(|t| t.value()), Some("foo_token"));
        assert!(!request.params().contains_key("access_token"));
        assert!(!request.params().contains_key("appsecret_proof"));
        assert_eq!(request.params()["k"], json!("v"));
    }

    #[test]
    fn test_token_mismatch() {
        let result = ApiRequest::builder(app())
            .method(HttpMethod::Get)
            .access_token(AccessToken::new("foo_token", None))
            .endpoint("/foo?access_token=bar_token")
            .build();
        assert!(matches!(
            result,
            Err(SdkError::Validation(ValidationError::TokenMismatch))
        ));

        let result = ApiRequest::builder(app())
            .method(HttpMethod::Post)
            .access_token(AccessToken::new("foo_token", None))
            .endpoint("/foo")
            .param("access_token", "bar_token")
            .build();
        assert!(matches!(
            result,
            Err(SdkError::Validation(ValidationError::TokenMismatch))
        ));
    }

    #[test]
    fn test_matching_token_is_accepted() {
        let request = ApiRequest::builder(app())
            .method(HttpMethod::Get)
            .access_token(AccessToken::new("foo_token", None))
            .endpoint("/foo?access_token=foo_token")
            .build()
            .unwrap();
        assert_eq!(request.endpoint(), "/foo");
    }

    #[test]
    fn test_get_url_carries_params_and_proof() {
        let request = ApiRequest::builder(app())
            .method(HttpMethod::Get)
            .access_token(AccessToken::new("foo_token", None))
            .endpoint("foo")
            .param("b", "2")
            .build()
            .unwrap();

        let proof = AccessToken::new("foo_token", None).app_secret_proof("foo_secret");
        assert_eq!(
            request.url(),
            format!("/foo?b=2&access_token=foo_token&appsecret_proof={}", proof)
        );
        assert!(request.body().unwrap().is_none());
    }

    #[test]
    fn test_get_url_merges_existing_query_sorted() {
        let request = ApiRequest::builder(app())
            .method(HttpMethod::Delete)
            .access_token(AccessToken::new("foo_token", None))
            .endpoint("/foo?z=1")
            .build()
            .unwrap();

        let url = request.url();
        assert!(url.starts_with("/foo?access_token=foo_token&appsecret_proof="));
        assert!(url.ends_with("&z=1"));
    }

    #[test]
    fn test_post_url_and_json_body() {
        let request = ApiRequest::builder(app())
            .method(HttpMethod::Post)
            .access_token(AccessToken::new("foo_token", None))
            .endpoint("/foo")
            .param("message", "hi")
            .build()
            .unwrap();

        assert_eq!(request.url(), "/foo");
        let body = request.body().unwrap().unwrap();
        assert_eq!(body.content_type, "application/json");

        let decoded: Value = serde_json::from_slice(&body.bytes).unwrap();
        assert_eq!(decoded["message"], json!("hi"));
        assert_eq!(decoded["access_token"], json!("foo_token"));
        assert_eq!(
            decoded["appsecret_proof"],
            json!(request.app_secret_proof().unwrap())
        );
    }

    #[test]
    fn test_files_use_multipart() {
        let request = ApiRequest::builder(app())
            .method(HttpMethod::Post)
            .endpoint("/me/photos")
            .param("caption", "cat")
            .file("source", FileUpload::new("cat.png", Bytes::from_static(b"PNG")))
            .build()
            .unwrap();

        assert!(request.contains_file_uploads());
        let body = request.body().unwrap().unwrap();
        assert!(body.content_type.starts_with("multipart/form-data; boundary="));
        let text = String::from_utf8_lossy(&body.bytes);
        assert!(text.contains("name=\"caption\"\r\n\r\ncat\r\n"));
        assert!(text.contains("filename=\"cat.png\"\r\nContent-Type: image/png\r\n\r\nPNG\r\n"));
    }

    #[test]
    fn test_no_token_means_no_proof() {
        let request = ApiRequest::builder(app())
            .method(HttpMethod::Get)
            .endpoint("/foo")
            .build()
            .unwrap();
        assert!(request.app_secret_proof().is_none());
        assert_eq!(request.url(), "/foo");
        assert!(matches!(
            request.validate_access_token(),
            Err(SdkError::Validation(ValidationError::MissingAccessToken))
        ));
    }

    #[test]
    fn test_headers_replace_case_insensitively() {
        let request = ApiRequest::builder(app())
            .method(HttpMethod::Get)
            .endpoint("/foo")
            .header("X-Trace", "1")
            .header("x-trace", "2")
            .build()
            .unwrap();
        assert_eq!(request.headers(), &[("x-trace".to_string(), "2".to_string())]);
    }
}
