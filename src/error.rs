use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Result alias for link lifecycle operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Failures reported by the link lifecycle engine.
///
/// Every variant is terminal: the core never retries on the caller's behalf.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Blank URL or a non-positive limit where one is required.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No live record exists for the code.
    #[error("short link '{0}' not found")]
    NotFound(String),

    /// The record had expired and was evicted while being read.
    #[error("short link '{0}' has expired and was removed")]
    Expired(String),

    /// The record is live but its visit budget is used up.
    #[error("short link '{0}' has reached its visit limit")]
    QuotaExceeded(String),

    /// The requester does not own the record.
    #[error("you are not the owner of short link '{0}'")]
    Forbidden(String),

    /// Every drawn candidate code was already taken.
    #[error("no free short code found after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
}

impl LinkError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LinkError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LinkError::NotFound(_) => StatusCode::NOT_FOUND,
            LinkError::Expired(_) => StatusCode::GONE,
            LinkError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            LinkError::Forbidden(_) => StatusCode::FORBIDDEN,
            LinkError::CodeSpaceExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
