// ABOUTME: Authentication route handlers for login, refresh, rotation, and identity
// ABOUTME: Thin handlers that delegate to the credential store and token manager
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright (c) 2025 Vigil Agent Contributors

//! Authentication routes.
//!
//! Login exchanges a username and password for a token pair, refresh
//! exchanges a refresh token for a new pair, and rotation replaces the
//! stored credentials. Failed logins and malformed tokens both answer a
//! uniform 401 so the response does not reveal which check failed.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::TokenPair;
use crate::errors::AgentError;
use crate::middleware::AuthenticatedUser;
use crate::routes::AppState;

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Credential rotation request
#[derive(Debug, Deserialize)]
pub struct ChangeCredentialsRequest {
    pub username: String,
    pub new_password: String,
}

/// Identity response
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub default_creds: bool,
}

/// Collapse extractor rejections to the uniform 400, keeping the body-cap
/// status distinct so an over-limit payload is not mistaken for bad JSON.
fn malformed(rejection: &JsonRejection) -> AgentError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AgentError::PayloadTooLarge
    } else {
        AgentError::invalid_input("bad request")
    }
}

/// Handle `POST /api/auth/login`.
///
/// # Errors
/// Returns 400 for malformed JSON, 413 for an over-limit body, and a
/// uniform 401 when the credentials do not match the record.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AgentError> {
    let Json(request) = payload.map_err(|rejection| malformed(&rejection))?;

    if !state
        .store
        .verify_login(&request.username, &request.password)
        .await?
    {
        debug!("login rejected");
        return Err(AgentError::InvalidToken);
    }

    let pair = state.tokens.issue_pair(&request.username)?;
    debug!("login accepted, token pair issued");
    Ok(Json(pair))
}

/// Handle `POST /api/auth/refresh`.
///
/// # Errors
/// Returns 400 for malformed JSON and 401 when the presented token is
/// not a live refresh token.
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AgentError> {
    let Json(request) = payload.map_err(|rejection| malformed(&rejection))?;
    let pair = state.tokens.refresh(&request.refresh_token)?;
    Ok(Json(pair))
}

/// Handle `POST /api/auth/change_credentials`.
///
/// Replaces the stored username and password hash. Tokens issued before
/// the rotation stay valid until they expire; the signing secret does
/// not change here.
///
/// # Errors
/// Returns 400 when either field is empty after trimming and 500 when
/// the replacement hash cannot be computed.
pub async fn change_credentials(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<ChangeCredentialsRequest>, JsonRejection>,
) -> Result<StatusCode, AgentError> {
    let Json(request) = payload.map_err(|rejection| malformed(&rejection))?;

    if request.username.trim().is_empty() || request.new_password.trim().is_empty() {
        return Err(AgentError::invalid_input("invalid input"));
    }

    let persisted = state
        .store
        .rotate(&request.username, &request.new_password)
        .await?;
    if persisted {
        info!(actor = %user.username(), "credentials rotated");
    } else {
        warn!(actor = %user.username(), "credentials rotated in memory only");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Handle `GET /api/me`.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<MeResponse> {
    Json(MeResponse {
        username: user.username().to_owned(),
        default_creds: state.store.default_credentials(),
    })
}
