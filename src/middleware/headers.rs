// ABOUTME: First gate: stamps the configured security headers onto every response
// ABOUTME: Applies on the way out, so gate denials and panics get the headers too
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::security::SecurityHeaders;

/// Precompute the header map once at router construction so the per-request
/// work is a handful of inserts.
#[must_use]
pub fn security_header_map(config: &SecurityHeaders) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in config.to_headers() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!("dropping unrepresentable security header {name}"),
        }
    }
    map
}

/// Apply the security headers to the outgoing response. This gate has no
/// rejection path; it sees every response the stack produces.
pub async fn security_headers_gate(
    State(headers): State<Arc<HeaderMap>>,
    req: Request,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    for (name, value) in headers.as_ref() {
        response.headers_mut().insert(name, value.clone());
    }
    response
}
