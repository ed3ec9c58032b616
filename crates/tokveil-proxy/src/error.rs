//! Error types for the token proxy.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors raised while handling a proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// `Authorization` header is not a scheme/credential pair.
    #[error("Malformed Auth Header")]
    MalformedAuthHeader,

    /// Inbound request body could not be read.
    #[error("Invalid request body: {0}")]
    RequestBody(String),

    /// Client IP is not on the allow-list.
    #[error("unauthorized")]
    ClientNotAllowed(String),

    /// Upstream could not be reached.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Request could not be built or the token response could not be rewritten.
    #[error("Request forwarding failed: {0}")]
    Forwarding(String),

    /// Opaque handle generation failed.
    #[error("Random source unavailable: {0}")]
    RandomSource(String),

    /// Proxy was built with unusable settings.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokveil_cache::Error> for ProxyError {
    fn from(e: tokveil_cache::Error) -> Self {
        match e {
            tokveil_cache::Error::RandomSource(msg) => ProxyError::RandomSource(msg),
            other => ProxyError::Forwarding(other.to_string()),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ProxyError {
    /// HTTP status and error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ProxyError::MalformedAuthHeader => (StatusCode::BAD_REQUEST, "malformed_auth_header"),
            ProxyError::RequestBody(_) => (StatusCode::BAD_REQUEST, "invalid_request_body"),
            ProxyError::ClientNotAllowed(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ProxyError::UpstreamUnreachable(_) => (StatusCode::BAD_GATEWAY, "upstream_unreachable"),
            ProxyError::Forwarding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "forwarding_failed"),
            ProxyError::RandomSource(_) => (StatusCode::INTERNAL_SERVER_ERROR, "random_source"),
            ProxyError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Proxy error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
