//! API Response
//!
//! Decoding of heterogeneous response bodies.

use bytes::Bytes;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use url::form_urlencoded;

use crate::core::TransportResponse;
use crate::error::{classify, ApiError, SdkError};
use crate::http::ApiRequest;
use crate::types::AccessToken;

/// A decoded response to an [`ApiRequest`].
#[derive(Clone, Debug)]
pub struct ApiResponse {
    request: ApiRequest,
    status: u16,
    headers: HashMap<String, String>,
    raw_body: Bytes,
    decoded_body: Value,
    error: Option<ApiError>,
}

impl ApiResponse {
    /// Decode a transport response. An `error` member in the body is
    /// classified immediately.
    pub fn new(request: ApiRequest, response: TransportResponse) -> Self {
        let decoded_body = decode_body(&response.body);
        let error = decoded_body
            .get("error")
            .filter(|error| !error.is_null())
            .is_some()
            .then(|| classify(&decoded_body, response.status));

        Self {
            request,
            status: response.status,
            headers: response.headers,
            raw_body: response.body,
            decoded_body,
            error,
        }
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.request.access_token()
    }

    pub fn app_secret_proof(&self) -> Option<String> {
        self.request.app_secret_proof()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Look up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn etag(&self) -> Option<&str> {
        self.header("etag")
    }

    /// Raw response body.
    pub fn body(&self) -> &Bytes {
        &self.raw_body
    }

    /// Decoded body: always a JSON object or array.
    pub fn decoded_body(&self) -> &Value {
        &self.decoded_body
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// Turn an API error into `Err`.
    pub fn into_result(self) -> Result<Self, SdkError> {
        match self.error {
            Some(error) => Err(error.into()),
            None => Ok(self),
        }
    }
}

/// Decode a body: JSON object or array as is, JSON booleans as `{success}`,
/// JSON numbers as `{id}`, then form-decoding, else an empty object.
pub fn decode_body(body: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => return value,
        Ok(Value::Bool(success)) => return json!({ "success": success }),
        Ok(Value::Number(id)) => return json!({ "id": id }),
        Ok(Value::String(s)) if s.parse::<f64>().is_ok() => return json!({ "id": s }),
        _ => {}
    }

    match std::str::from_utf8(body) {
        Ok(text) if text.contains('=') => {
            let map: Map<String, Value> = form_urlencoded::parse(text.trim().as_bytes())
                .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
                .collect();
            Value::Object(map)
        }
        _ => Value::Object(Map::new()),
    }
}
