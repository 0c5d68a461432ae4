//! API error type and its JSON rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to HTTP clients.
///
/// Every variant renders as `{success: false, error, message}`, the same
/// envelope the upstream hotel API and the fallback catalog use.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404). `error` is the short label, e.g. "Hotel not found".
    #[error("{error}: {message}")]
    NotFound { error: String, message: String },

    /// Bad request (400).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream unreachable and no substitute allowed (502).
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Generic internal error (500).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn hotel_not_found(id: &str) -> Self {
        Self::not_found("Hotel not found", format!("No hotel found with id {id}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::NotFound { error, .. } => error,
            Self::BadRequest(_) => "Bad Request",
            Self::BadGateway(_) => "Bad Gateway",
            Self::Internal(_) => "Internal Server Error",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::NotFound { message, .. } => message,
            Self::BadRequest(msg) | Self::BadGateway(msg) | Self::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = %self, "request failed");
        }

        let body = json!({
            "success": false,
            "error": self.label(),
            "message": self.message(),
        });

        (self.status(), Json(body)).into_response()
    }
}
