//! API errors and their wire representation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use trustchain::keys::KeyError;
use trustchain::LedgerError;

/// Errors surfaced by the HTTP handlers.
///
/// Every variant maps to a stable `{ "error": <code> }` body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required request field was absent.
    #[error("{0}_required")]
    MissingField(&'static str),

    /// The request body was not the expected JSON.
    #[error("invalid json: {0}")]
    InvalidJson(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Key(#[from] KeyError),

    /// A blocking task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status and stable error code.
    pub fn parts(&self) -> (StatusCode, String) {
        match self {
            Self::MissingField(field) => (StatusCode::BAD_REQUEST, format!("{field}_required")),
            Self::InvalidJson(_) => (StatusCode::BAD_REQUEST, "invalid_json".into()),
            Self::Ledger(LedgerError::SignatureInvalid) => {
                (StatusCode::BAD_REQUEST, "signature_invalid".into())
            }
            Self::Ledger(LedgerError::Persist(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persist_failed".into())
            }
            Self::Ledger(LedgerError::Recovery(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "reload_failed".into())
            }
            Self::Ledger(LedgerError::Unavailable) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ledger_unavailable".into())
            }
            Self::Key(_) => (StatusCode::INTERNAL_SERVER_ERROR, "rotate_failed".into()),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error".into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            error!(error = %self, code = %code, "request failed");
        }
        (status, Json(json!({ "error": code }))).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        Self::InvalidJson(rejection.body_text())
    }
}

/// Unwrap an optional request field.
pub fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ApiError> {
    value.ok_or(ApiError::MissingField(field))
}

/// Result type for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
