// ABOUTME: Route module organization and router assembly in gate order
// ABOUTME: Wires the access gates around the auth, health, metrics, and system endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

//! Route modules and the router assembly.
//!
//! The router is where the gate order is fixed. From the outside in:
//! security headers, request identity tagging, latency tracing, panic
//! containment, network allowlist, then under `/api` the client-key gate,
//! and on protected routes the bearer gate. A request denied at any gate
//! still passes back out through the response side of the outer gates, so
//! denials carry the security headers and a request ID.

/// Authentication endpoints: login, refresh, rotation, identity
pub mod auth;
/// Liveness endpoint
pub mod health;
/// Metric snapshot and stream endpoints
pub mod metrics;
/// OS-entity endpoints: processes, services, containers, logins
pub mod system;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span};

use crate::auth::TokenManager;
use crate::config::{AgentConfig, CredentialStore};
use crate::middleware::{
    allowlist_gate, client_key_gate, require_access_token, security_header_map,
    security_headers_gate, Allowlist, ClientKeyPolicy,
};
use crate::security::SecurityHeaders;

pub use auth::{ChangeCredentialsRequest, LoginRequest, MeResponse, RefreshRequest};

/// Per-request time budget for the JSON endpoints. The metrics stream is
/// exempt so the SSE connection can outlive it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Request body cap. The largest legitimate payload is a credential
/// rotation, which is tiny.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The mutable identity record.
    pub store: Arc<CredentialStore>,
    /// Token issuance and verification.
    pub tokens: Arc<TokenManager>,
}

/// Gate configuration snapshotted from the record at startup.
#[derive(Debug, Clone, Default)]
pub struct GateConfig {
    /// Response header set for the outermost gate.
    pub security: SecurityHeaders,
    /// Parsed network allowlist.
    pub allowlist: Allowlist,
    /// Pre-shared client-key material.
    pub client_key: ClientKeyPolicy,
}

impl GateConfig {
    /// Snapshot the gate inputs from a loaded record.
    #[must_use]
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            security: SecurityHeaders::default(),
            allowlist: Allowlist::parse(&config.allowed_cidrs),
            client_key: ClientKeyPolicy::from_config(config),
        }
    }
}

/// Assemble the full router with every gate in its place.
#[must_use]
pub fn router(state: AppState, gates: &GateConfig) -> Router {
    let header_map = Arc::new(security_header_map(&gates.security));
    let client_key = Arc::new(gates.client_key.clone());

    let json_protected = Router::new()
        .route("/me", get(auth::me))
        .route("/auth/change_credentials", post(auth::change_credentials))
        .route("/metrics", get(metrics::metrics))
        .route("/processes", get(system::processes))
        .route("/services", get(system::services))
        .route("/containers", get(system::containers))
        .route("/logins", get(system::logins))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    let stream_protected = Router::new().route("/metrics/stream", get(metrics::metrics_stream));

    let protected = json_protected.merge(stream_protected).route_layer(
        middleware::from_fn_with_state(state.tokens.clone(), require_access_token),
    );

    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(client_key, client_key_gate));

    let mut app = Router::new()
        .route("/healthz", get(health::healthz))
        .nest("/api", api)
        .with_state(state);

    if !gates.allowlist.is_empty() {
        let allowlist = Arc::new(gates.allowlist.clone());
        app = app.layer(middleware::from_fn_with_state(allowlist, allowlist_gate));
    }

    app.layer(CatchPanicLayer::custom(handle_panic))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::extract::Request| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                    )
                })
                .on_response(
                    |response: &Response, latency: Duration, _span: &tracing::Span| {
                        info!(
                            status = response.status().as_u16(),
                            latency_ms = latency.as_millis() as u64,
                            "request completed"
                        );
                    },
                ),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(middleware::from_fn_with_state(
            header_map,
            security_headers_gate,
        ))
}

/// Panic containment: record the fault, answer a generic 500, keep serving.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = match err.downcast::<String>() {
        Ok(message) => *message,
        Err(err) => match err.downcast::<&'static str>() {
            Ok(message) => (*message).to_owned(),
            Err(_) => "opaque panic payload".to_owned(),
        },
    };
    error!("handler panicked: {detail}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}
