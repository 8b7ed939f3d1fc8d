// ABOUTME: Pre-shared client-key gate applied to the /api prefix
// ABOUTME: Bcrypt hash comparison preferred, constant-time plaintext equality for legacy records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tokio::task;
use tracing::debug;

use crate::config::credentials::verify_password;
use crate::config::AgentConfig;
use crate::errors::AgentError;

/// The client-key material the gate checks against, snapshotted at router
/// construction. The hash form always wins over the plaintext form.
#[derive(Debug, Clone, Default)]
pub struct ClientKeyPolicy {
    key_hash: Option<String>,
    key_plain: Option<String>,
}

impl ClientKeyPolicy {
    /// Capture the configured key material.
    #[must_use]
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            key_hash: config.client_key_hash.clone().filter(|h| !h.is_empty()),
            key_plain: config.client_key.clone().filter(|k| !k.is_empty()),
        }
    }

    /// Whether any key material is configured. With none, the gate is
    /// disabled and requests pass through.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.key_hash.is_some() || self.key_plain.is_some()
    }
}

/// Require a valid `X-Client-Key` header whenever key material is
/// configured. Missing header, empty header, and wrong key all collapse
/// into the same bare 403.
pub async fn client_key_gate(
    State(policy): State<Arc<ClientKeyPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    if !policy.enabled() {
        return next.run(req).await;
    }

    let presented = req
        .headers()
        .get("x-client-key")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned);
    let Some(presented) = presented else {
        debug!("client key gate: header missing");
        return AgentError::AccessDenied.into_response();
    };

    let accepted = if let Some(hash) = policy.key_hash.clone() {
        task::spawn_blocking(move || verify_password(&hash, &presented))
            .await
            .unwrap_or(false)
    } else {
        policy
            .key_plain
            .as_deref()
            .is_some_and(|expected| constant_time_eq(expected.as_bytes(), presented.as_bytes()))
    };

    if accepted {
        next.run(req).await
    } else {
        debug!("client key gate: verification failed");
        AgentError::AccessDenied.into_response()
    }
}

/// Length leaks are unavoidable with unequal inputs; content comparison is
/// constant-time.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
