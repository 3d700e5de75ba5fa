use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Application-level error kinds. Handlers return these and let the
/// `IntoResponse` impl decide the HTTP status, instead of hand-building
/// `(StatusCode, Json<String>)` pairs at every call site.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or out-of-range input (non-positive shares, zero delta,
    /// share count driven negative, empty ticker).
    #[error("{0}")]
    Validation(String),

    /// A mutation targeted a ticker with no existing holding.
    #[error("{0}")]
    NotFound(String),

    /// No session, or the session has expired.
    #[error("not logged in")]
    Unauthorized,

    /// Logged in, but the member lacks the required capability.
    #[error("{0}")]
    Forbidden(String),

    /// The market-data provider failed or returned no usable value.
    #[error("no market data available for '{0}'")]
    MarketData(String),

    /// Persistence layer failure on read or write. Not retried.
    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::MarketData(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
