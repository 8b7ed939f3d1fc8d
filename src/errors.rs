// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Unified Error Handling
//!
//! The taxonomy separates faults by consequence rather than by origin:
//! configuration and trust-material errors abort startup, persistence errors
//! degrade to best-effort, and request-path errors map onto uniform HTTP
//! denials that leak no internal detail. Whatever detail exists goes to the
//! structured log, never into a response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Convenience alias used throughout the crate.
pub type AgentResult<T> = Result<T, AgentError>;

/// All error conditions the agent distinguishes.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Invalid or unusable configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unusable TLS trust material (certificate, key, or client CA pool).
    /// Fatal at startup when mTLS is required.
    #[error("trust configuration error: {0}")]
    TrustConfig(String),

    /// The persisted record could not be written. The in-memory state is
    /// still authoritative; callers decide whether to degrade or abort.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A bearer token failed verification. Expired, forged, malformed, and
    /// wrong-use tokens are deliberately indistinguishable to callers.
    #[error("invalid token")]
    InvalidToken,

    /// A gate denied the request (allowlist or client-key failure).
    #[error("access denied")]
    AccessDenied,

    /// The request payload was malformed or failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request body exceeded the configured cap.
    #[error("payload too large")]
    PayloadTooLarge,

    /// An unexpected internal fault.
    #[error("internal fault: {0}")]
    Internal(String),
}

impl AgentError {
    /// Configuration error with the given detail.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Trust-material error with the given detail.
    #[must_use]
    pub fn trust(msg: impl Into<String>) -> Self {
        Self::TrustConfig(msg.into())
    }

    /// Persistence error with the given detail.
    #[must_use]
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Input validation error; the message is safe to surface.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Internal fault with the given detail (logged, never surfaced).
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status this error maps to when it reaches a response boundary.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Config(_) | Self::TrustConfig(_) | Self::Persistence(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message surfaced to clients. Internal detail never crosses this
    /// boundary; denials stay uniform so probing reveals nothing.
    #[must_use]
    pub fn public_message(&self) -> &str {
        match self {
            Self::InvalidToken => "unauthorized",
            Self::AccessDenied => "forbidden",
            Self::InvalidInput(msg) => msg,
            Self::PayloadTooLarge => "payload too large",
            Self::Config(_) | Self::TrustConfig(_) | Self::Persistence(_) | Self::Internal(_) => {
                "internal server error"
            }
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
