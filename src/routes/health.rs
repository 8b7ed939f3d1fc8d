// ABOUTME: Liveness route handler for supervisors and load balancer probes
// ABOUTME: Answers before any credential gate so probes need no secrets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

//! Liveness route.
//!
//! `/healthz` sits outside `/api`, so it passes the allowlist gate but
//! neither the client-key nor the bearer gate. Probes only need network
//! reachability, never credentials.

use axum::Json;

/// Handle `GET /healthz`.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
