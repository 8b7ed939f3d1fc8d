// ABOUTME: Integration tests for the ordered access gates around the router
// ABOUTME: Covers headers, request IDs, allowlist, client key, bearer, and body limit behavior
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use helpers::http::TestRequest;
use serde_json::json;
use vigil_agent::config::{hash_password, AgentConfig};

#[tokio::test]
async fn test_healthz_needs_no_credentials() {
    let (app, _store, _tokens, _dir) = common::default_agent().await;

    let body: serde_json::Value = TestRequest::get("/healthz")
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_a_bearer_token() {
    let (app, _store, _tokens, _dir) = common::default_agent().await;

    for path in [
        "/api/me",
        "/api/metrics",
        "/api/metrics/stream",
        "/api/processes",
        "/api/services",
        "/api/containers",
        "/api/logins",
    ] {
        let response = TestRequest::get(path).send(app.clone()).await;
        assert_eq!(response.status(), 401, "expected 401 for {path}");
    }
}

#[tokio::test]
async fn test_security_headers_cover_every_response() {
    let (app, _store, _tokens, _dir) = common::default_agent().await;

    // Success, denial, and unknown route all pass back out through the
    // header gate.
    for (path, expected) in [("/healthz", 200), ("/api/me", 401), ("/nowhere", 404)] {
        let response = TestRequest::get(path).send(app.clone()).await;
        assert_eq!(response.status(), expected, "status for {path}");
        assert_eq!(
            response.header("x-content-type-options"),
            Some("nosniff"),
            "nosniff on {path}"
        );
        assert_eq!(response.header("x-frame-options"), Some("DENY"));
        assert!(response
            .header("content-security-policy")
            .unwrap()
            .contains("default-src 'none'"));
        assert!(response.header("strict-transport-security").is_some());
    }
}

#[tokio::test]
async fn test_request_ids_are_assigned_and_propagated() {
    let (app, _store, _tokens, _dir) = common::default_agent().await;

    let assigned = TestRequest::get("/healthz").send(app.clone()).await;
    assert!(!assigned.header("x-request-id").unwrap().is_empty());

    let echoed = TestRequest::get("/healthz")
        .header("x-request-id", "caller-chosen-id")
        .send(app)
        .await;
    assert_eq!(echoed.header("x-request-id"), Some("caller-chosen-id"));
}

#[tokio::test]
async fn test_client_key_gate_guards_the_api_surface() {
    let dir = tempfile::tempdir().unwrap();
    let config = AgentConfig {
        client_key_hash: Some(hash_password("psk-secret").unwrap()),
        ..common::base_config(dir.path())
    };
    let (app, _store, _tokens) = common::build_agent(config).await;

    // Missing key: denied before credentials are even read.
    TestRequest::post("/api/auth/login")
        .json(&json!({ "username": "admin", "password": common::TEST_PASSWORD }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Wrong key: same denial.
    TestRequest::post("/api/auth/login")
        .client_key("wrong")
        .json(&json!({ "username": "admin", "password": common::TEST_PASSWORD }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Right key: the request reaches the login handler.
    TestRequest::post("/api/auth/login")
        .client_key("psk-secret")
        .json(&json!({ "username": "admin", "password": common::TEST_PASSWORD }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    // The liveness probe sits outside /api and needs no key.
    TestRequest::get("/healthz")
        .send(app)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_client_key_plaintext_record_still_enforced() {
    // Older records carry the key in plaintext; the gate falls back to a
    // constant-time comparison instead of bcrypt.
    let dir = tempfile::tempdir().unwrap();
    let config = AgentConfig {
        client_key: Some("legacy-key".into()),
        ..common::base_config(dir.path())
    };
    let (app, _store, _tokens) = common::build_agent(config).await;

    TestRequest::post("/api/auth/login")
        .json(&json!({ "username": "admin", "password": common::TEST_PASSWORD }))
        .send(app.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    TestRequest::post("/api/auth/login")
        .client_key("legacy-key")
        .json(&json!({ "username": "admin", "password": common::TEST_PASSWORD }))
        .send(app)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_allowlist_filters_by_source_address() {
    let dir = tempfile::tempdir().unwrap();
    let config = AgentConfig {
        allowed_cidrs: vec!["10.0.0.0/8".into(), "192.168.1.0/24".into()],
        ..common::base_config(dir.path())
    };
    let (app, _store, _tokens) = common::build_agent(config).await;

    // The default test peer is 127.0.0.1, outside both ranges.
    TestRequest::get("/healthz")
        .send(app.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    TestRequest::get("/healthz")
        .from_peer("10.20.30.40:55555")
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    TestRequest::get("/healthz")
        .from_peer("192.168.1.9:40000")
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    TestRequest::get("/healthz")
        .from_peer("192.168.2.9:40000")
        .send(app)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_allowlist_outranks_the_bearer_gate() {
    let dir = tempfile::tempdir().unwrap();
    let config = AgentConfig {
        allowed_cidrs: vec!["10.0.0.0/8".into()],
        ..common::base_config(dir.path())
    };
    let (app, _store, tokens) = common::build_agent(config).await;
    let pair = tokens.issue_pair("admin").unwrap();

    // A valid token does not help a denied peer: 403 from the network
    // gate, not 401 from the bearer gate.
    TestRequest::get("/api/me")
        .bearer(&pair.access_token)
        .send(app.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    TestRequest::get("/api/me")
        .from_peer("10.1.1.1:3000")
        .bearer(&pair.access_token)
        .send(app)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_client_key_gate_runs_before_the_bearer_gate() {
    let dir = tempfile::tempdir().unwrap();
    let config = AgentConfig {
        client_key_hash: Some(hash_password("psk-secret").unwrap()),
        ..common::base_config(dir.path())
    };
    let (app, _store, _tokens) = common::build_agent(config).await;

    // No key and no token: the key gate answers first with 403.
    TestRequest::get("/api/me")
        .send(app.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Key but no token: now the bearer gate answers with 401.
    TestRequest::get("/api/me")
        .client_key("psk-secret")
        .send(app)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oversized_bodies_are_cut_off() {
    let (app, _store, _tokens, _dir) = common::default_agent().await;

    let padding = "x".repeat(70 * 1024);
    let response = TestRequest::post("/api/auth/login")
        .json(&json!({ "username": "admin", "password": padding }))
        .send(app)
        .await;
    assert_eq!(response.status(), 413);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_a_snapshot() {
    let (app, _store, tokens, _dir) = common::default_agent().await;
    let pair = tokens.issue_pair("admin").unwrap();

    let body: serde_json::Value = TestRequest::get("/api/metrics")
        .bearer(&pair.access_token)
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();

    assert!(body["cpu_percent"].is_number());
    assert!(body["memory_total"].as_u64().unwrap() > 0);
    assert!(body["disk_usage"].is_object());
    assert!(body["uptime"].is_number());
}

#[tokio::test]
async fn test_metrics_stream_emits_snapshot_events() {
    let (app, _store, tokens, _dir) = common::default_agent().await;
    let pair = tokens.issue_pair("admin").unwrap();

    let response = TestRequest::get("/api/metrics/stream")
        .bearer(&pair.access_token)
        .send_stream(app)
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.header("content-type"),
        Some("text/event-stream"),
    );
    assert_eq!(response.header("cache-control"), Some("no-cache"));

    let first_chunk = response.text();
    assert!(first_chunk.contains("data:"), "chunk: {first_chunk:?}");
    assert!(first_chunk.contains("memory_total"));
}

#[tokio::test]
async fn test_process_listing_answers_with_entries() {
    let (app, _store, tokens, _dir) = common::default_agent().await;
    let pair = tokens.issue_pair("admin").unwrap();

    let body: serde_json::Value = TestRequest::get("/api/processes")
        .bearer(&pair.access_token)
        .send(app)
        .await
        .assert_status(StatusCode::OK)
        .json();

    let list = body.as_array().unwrap();
    assert!(!list.is_empty());
    assert!(list[0]["pid"].is_number());
}

#[tokio::test]
async fn test_service_listing_degrades_cleanly_without_systemd() {
    let (app, _store, tokens, _dir) = common::default_agent().await;
    let pair = tokens.issue_pair("admin").unwrap();

    let response = TestRequest::get("/api/services")
        .bearer(&pair.access_token)
        .send(app)
        .await;

    // Hosts with systemd answer the unit list; hosts without answer 503.
    assert!(
        response.status() == 200 || response.status() == 503,
        "unexpected status {}",
        response.status()
    );
}

#[tokio::test]
async fn test_container_and_login_listings_never_error() {
    let (app, _store, tokens, _dir) = common::default_agent().await;
    let pair = tokens.issue_pair("admin").unwrap();

    TestRequest::get("/api/containers")
        .bearer(&pair.access_token)
        .send(app.clone())
        .await
        .assert_status(StatusCode::OK);

    TestRequest::get("/api/logins")
        .bearer(&pair.access_token)
        .send(app)
        .await
        .assert_status(StatusCode::OK);
}
