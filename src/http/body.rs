//! Request Body Strategies
//!
//! URL-encoded, JSON and multipart encodings behind one contract.

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::{build_query, flatten_params, Params};
use crate::error::{SdkError, ValidationError};
use crate::types::FileUpload;

/// An encoded request body with its content type.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedBody {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Request body encoding interface.
pub trait RequestBody {
    /// Encode the body.
    fn encode(&self) -> Result<EncodedBody, SdkError>;
}

/// `application/x-www-form-urlencoded` body.
#[derive(Clone, Debug)]
pub struct UrlEncodedBody {
    params: Params,
}

impl UrlEncodedBody {
    pub fn new(params: Params) -> Self {
        Self { params }
    }
}

impl RequestBody for UrlEncodedBody {
    fn encode(&self) -> Result<EncodedBody, SdkError> {
        Ok(EncodedBody {
            bytes: Bytes::from(build_query(&self.params)),
            content_type: "application/x-www-form-urlencoded".to_string(),
        })
    }
}

/// `application/json` body carrying the full param map.
#[derive(Clone, Debug)]
pub struct JsonBody {
    params: Params,
}

impl JsonBody {
    pub fn new(params: Params) -> Self {
        Self { params }
    }
}

impl RequestBody for JsonBody {
    fn encode(&self) -> Result<EncodedBody, SdkError> {
        let bytes = serde_json::to_vec(&self.params).map_err(|e| ValidationError::InvalidParams {
            message: e.to_string(),
        })?;
        Ok(EncodedBody {
            bytes: Bytes::from(bytes),
            content_type: "application/json".to_string(),
        })
    }
}

/// `multipart/form-data` body with file parts.
#[derive(Clone, Debug)]
pub struct MultipartBody {
    params: Params,
    files: Vec<(String, FileUpload)>,
    boundary: String,
}

impl MultipartBody {
    /// Create a multipart body; a boundary is generated when none is given.
    pub fn new(params: Params, files: Vec<(String, FileUpload)>, boundary: Option<String>) -> Self {
        Self {
            params,
            files,
            boundary: boundary.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }
}

/// Escape a value for a quoted `Content-Disposition` parameter.
///
/// `"`, CR and LF are percent-encoded the way HTML form submission does.
fn escape_disposition(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Header values cannot span lines.
fn strip_line_breaks(value: &str) -> String {
    value.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

impl RequestBody for MultipartBody {
    fn encode(&self) -> Result<EncodedBody, SdkError> {
        let mut body = BytesMut::new();

        for (name, value) in flatten_params(&self.params) {
            body.put_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    self.boundary,
                    escape_disposition(&name),
                    value
                )
                .as_bytes(),
            );
        }

        for (name, file) in &self.files {
            body.put_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    self.boundary,
                    escape_disposition(name),
                    escape_disposition(&file.file_name),
                    strip_line_breaks(&file.mime_type)
                )
                .as_bytes(),
            );
            body.put_slice(&file.content);
            body.put_slice(b"\r\n");
        }

        body.put_slice(format!("--{}--\r\n", self.boundary).as_bytes());

        Ok(EncodedBody {
            bytes: body.freeze(),
            content_type: format!("multipart/form-data; boundary={}", self.boundary),
        })
    }
}
