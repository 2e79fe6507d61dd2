//! Error types for prism.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for prism operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for prism.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unknown model '{model}'")]
    UnknownModel { model: String },

    #[error("Upstream connection failed: {0}")]
    UpstreamConnect(String),

    #[error("Upstream stream failed: {0}")]
    UpstreamStream(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::UnknownModel { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            Error::UpstreamConnect(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            // Mid-stream failures never reach this path once the SSE
            // response has been committed; this mapping covers the
            // pre-stream window only.
            Error::UpstreamStream(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            Error::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let body = serde_json::json!({
            "error": {
                "message": message,
                "type": "prism_error",
                "code": status.as_u16()
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
