//! Error handling at the HTTP boundary
//!
//! Handlers return `ApiError`, which maps to a status code and a
//! `{"error": "..."}` JSON body. Failures are reported immediately; nothing
//! is retried.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::storage::StorageError;

/// Who is at fault for a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or missing input (4xx)
    Client,

    /// Storage, rendering or other internal failures (5xx)
    Server,
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed request payload
    #[error("{0}")]
    BadRequest(String),

    /// Body exceeded the configured upload ceiling
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Writing the upload failed; the registry was not touched
    #[error("Failed to upload image")]
    Storage(#[source] StorageError),

    /// QR code generation failed
    #[error("Failed to generate QR code")]
    QrCode(#[source] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(_) | Self::QrCode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        if self.status().is_client_error() {
            ErrorCategory::Client
        } else {
            ErrorCategory::Server
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidSessionId(id) => {
                Self::BadRequest(format!("Invalid session id: {id:?}"))
            }
            other => Self::Storage(other),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.category() {
            ErrorCategory::Client => warn!(error = %self, "request rejected"),
            ErrorCategory::Server => {
                let cause = std::error::Error::source(&self)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                error!(error = %self, cause = %cause, "request failed");
            }
        }

        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::bad_request("No image provided").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::PayloadTooLarge("too big".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::QrCode(anyhow::anyhow!("boom")).category(),
            ErrorCategory::Server
        );
    }

    #[test]
    fn test_storage_error_conversion() {
        let invalid: ApiError = StorageError::InvalidSessionId("..".into()).into();
        assert_eq!(invalid.category(), ErrorCategory::Client);

        let io: ApiError = StorageError::Io {
            path: PathBuf::from("/uploads/s1"),
            source: std::io::Error::other("disk full"),
        }
        .into();
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // internal details stay out of the response body
        assert_eq!(io.to_string(), "Failed to upload image");
    }
}
