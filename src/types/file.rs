//! File Upload Types

use bytes::Bytes;
use std::path::Path;

use crate::error::{SdkError, ValidationError};

const DEFAULT_MIME_TYPE: &str = "text/plain";

/// A file attached to a multipart request.
#[derive(Clone, Debug, PartialEq)]
pub struct FileUpload {
    /// File name sent in the part header.
    pub file_name: String,
    /// File content.
    pub content: Bytes,
    /// MIME type.
    pub mime_type: String,
}

impl FileUpload {
    /// Create a file upload from in-memory content.
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_type_for(&file_name);
        Self {
            file_name,
            content: content.into(),
            mime_type,
        }
    }

    /// Read a whole file from disk.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SdkError> {
        Self::open_range(path, None, None).await
    }

    /// Read at most `max_length` bytes of a file, starting at `offset`.
    pub async fn open_range(
        path: impl AsRef<Path>,
        max_length: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Self, SdkError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ValidationError::FileUnreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let start = offset.unwrap_or(0).min(data.len());
        let end = match max_length {
            Some(len) => start.saturating_add(len).min(data.len()),
            None => data.len(),
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            mime_type: mime_type_for(&file_name),
            file_name,
            content: Bytes::copy_from_slice(&data[start..end]),
        })
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

fn mime_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first()
        .map(|mime| mime.to_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}
