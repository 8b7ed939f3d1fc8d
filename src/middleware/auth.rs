// ABOUTME: Bearer-token gate for protected routes with authenticated-subject propagation
// ABOUTME: Verifies the access token and inserts the subject into request extensions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

//! # Bearer Gate
//!
//! The innermost gate. It accepts only a live access token; refresh tokens
//! are valid signatures with the wrong use and are rejected just as
//! uniformly as forged ones. On success the authenticated subject rides in
//! the request extensions so handlers never re-parse the header.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(tokens, require_access_token));
//! ```

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::auth::{TokenManager, TokenUse};
use crate::errors::AgentError;

/// The subject a verified access token authenticated, available to handlers
/// behind the bearer gate via `Extension`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    /// The authenticated username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.0
    }
}

/// Verify the `Authorization: Bearer` header and require an access-use
/// token. Every failure mode answers the same 401.
pub async fn require_access_token(
    State(tokens): State<Arc<TokenManager>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        debug!("bearer gate: missing or malformed authorization header");
        return AgentError::InvalidToken.into_response();
    };

    match tokens.verify(token) {
        Ok(claims) if claims.token_use == TokenUse::Access => {
            req.extensions_mut().insert(AuthenticatedUser(claims.sub));
            next.run(req).await
        }
        Ok(claims) => {
            debug!(
                "bearer gate: rejected {} token where access was required",
                claims.token_use.as_str()
            );
            AgentError::InvalidToken.into_response()
        }
        Err(err) => err.into_response(),
    }
}
