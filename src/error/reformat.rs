//! Request-fatal errors of the upload flow and their HTTP mapping.
//!
//! Only structurally broken uploads and an unreachable downstream end up
//! here. Anything wrong with the image itself is recovered inside the
//! pipeline and the bytes are forwarded unchanged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::multipart::MultipartError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReformatError {
    /// The configured upload field is absent or is not a file part.
    #[error("missing file field {0:?}")]
    MissingFile(String),

    /// The multipart body could not be read (malformed, or over the size
    /// ceiling).
    #[error("invalid multipart body: {message}")]
    Multipart { status: StatusCode, message: String },

    /// The downstream destination could not be reached.
    #[error("forwarding failed: {0}")]
    Forward(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MultipartError> for ReformatError {
    fn from(err: MultipartError) -> Self {
        let message = err.to_string();
        let status = err.into_response().status();
        ReformatError::Multipart { status, message }
    }
}

impl ReformatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ReformatError::MissingFile(_) => StatusCode::BAD_REQUEST,
            ReformatError::Multipart { status, .. } => *status,
            ReformatError::Forward(_) => StatusCode::FAILED_DEPENDENCY,
            ReformatError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for ReformatError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ReformatError::MissingFile("assetData".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ReformatError::Multipart {
                status: StatusCode::PAYLOAD_TOO_LARGE,
                message: "too big".into(),
            }
            .status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ReformatError::Internal("join".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_display() {
        let err = ReformatError::MissingFile("assetData".into());
        assert_eq!(err.to_string(), "missing file field \"assetData\"");
    }

    #[tokio::test]
    async fn into_response_has_json_body() {
        let res = ReformatError::MissingFile("file".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = res.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 400);
        assert!(json["error"].as_str().unwrap().contains("file"));
    }
}
