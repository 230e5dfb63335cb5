//! Error type returned by admin handlers.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::artifacts::ArtifactError;
use crate::lifecycle::RouteError;

/// Failures are answered with the error message as a plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),
    #[error("invalid upload: {0}")]
    Upload(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Route(_) | Self::Body(_) | Self::Artifact(ArtifactError::Io { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Artifact(ArtifactError::InvalidName(_)) | Self::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
        };
        warn!(status = status.as_u16(), error = %self, "admin request failed");
        (status, self.to_string()).into_response()
    }
}
