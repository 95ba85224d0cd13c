// 错误处理
use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

/// Message returned to callers when the upstream could not be reached.
pub const UPSTREAM_UNAVAILABLE_MESSAGE: &str = "An unexpected error occurred in the proxy server.";

/// Failures resolved at the relay boundary.
///
/// A non-2xx upstream answer is not represented here: it is relayed as-is.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Configuration(String),

    /// Carries the raw transport cause for logging only.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Configuration(_) | ProxyError::UpstreamUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to show the caller.
    pub fn public_message(&self) -> String {
        match self {
            ProxyError::UpstreamUnavailable(_) => UPSTREAM_UNAVAILABLE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.public_message() });
        (self.status(), Json(body)).into_response()
    }
}
