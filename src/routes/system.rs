// ABOUTME: OS-entity route handlers for processes, services, containers, and logins
// ABOUTME: Thin wrappers over the collectors with degraded answers where the host lacks a backend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

//! OS-entity routes.
//!
//! Processes, containers, and logins always answer 200 with whatever the
//! host could report, possibly an empty list. Services are the exception:
//! a host without systemd answers 503 so clients can tell "no services"
//! from "cannot ask".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::collect::{self, ContainerInfo, LoginSession, ProcessInfo, ServiceQueryError};

/// Handle `GET /api/processes`.
pub async fn processes() -> Json<Vec<ProcessInfo>> {
    Json(collect::processes().await)
}

/// Handle `GET /api/services`.
///
/// 503 when systemd cannot be queried at all, 500 when the query ran but
/// failed, 200 with the unit list otherwise.
pub async fn services() -> Response {
    match collect::services().await {
        Ok(units) => Json(units).into_response(),
        Err(ServiceQueryError::Unavailable) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "systemd unavailable" })),
        )
            .into_response(),
        Err(ServiceQueryError::Failed(detail)) => {
            error!("service listing failed: {detail}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal server error" })),
            )
                .into_response()
        }
    }
}

/// Handle `GET /api/containers`.
///
/// Hosts without docker or podman answer an empty list, not an error.
pub async fn containers() -> Json<Vec<ContainerInfo>> {
    Json(collect::containers().await)
}

/// Handle `GET /api/logins`.
pub async fn logins() -> Json<Vec<LoginSession>> {
    Json(collect::logins().await)
}
