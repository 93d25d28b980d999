//! Publisher errors and their HTTP mapping.

use std::io::ErrorKind;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chunkxfer_transfer::TransferError;
use tracing::{error, warn};

/// Errors produced while serving a request or running the server.
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("generation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl PublisherError {
    /// HTTP status reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::Transfer(TransferError::MetadataNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Io(e) if e.kind() == ErrorKind::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PublisherError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Details stay in the log; the caller only sees the status text.
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = status.canonical_reason().unwrap_or("error");
        (status, body).into_response()
    }
}
