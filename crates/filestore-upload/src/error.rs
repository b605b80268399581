//! HTTP error response conversion
//!
//! Every upload failure renders as a generic "bad upload" body. Storage
//! failures use 500, everything caused by the request uses 400.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use filestore_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

pub const BAD_UPLOAD: &str = "bad upload";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read multipart: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("Failed to read file data: {0}")]
    Stream(String),

    #[error("Failed to generate filename: {0}")]
    Filename(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Standard error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Upload failed");
        } else {
            tracing::warn!(error = %self, "Upload rejected");
        }

        let body = ErrorResponse {
            error: BAD_UPLOAD.to_string(),
            details: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_errors_are_bad_requests() {
        let err = UploadError::UnexpectedField("avatar".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn filename_errors_are_bad_requests() {
        let err = UploadError::Filename("no name".to_string());
        assert_eq!(err.to_string(), "Failed to generate filename: no name");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_errors_are_server_errors() {
        let err = UploadError::from(StorageError::NotFound("k".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
