// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides config, credential store, and router builders used across test files
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright (c) 2025 Vigil Agent Contributors
#![allow(
    dead_code,
    clippy::wildcard_in_or_patterns,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `vigil_agent`
//!
//! Builders for configuration records and fully-assembled routers so the
//! integration tests stay focused on behavior.

use std::path::Path;
use std::sync::{Arc, Once};

use axum::Router;
use vigil_agent::auth::TokenManager;
use vigil_agent::config::{generate_secret, hash_password, AgentConfig, CredentialStore};
use vigil_agent::routes::{self, AppState, GateConfig};

/// Password every test record is provisioned with.
pub const TEST_PASSWORD: &str = "test-password";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// A ready-to-run configuration record rooted in the given directory.
///
/// Credentials are `admin` / [`TEST_PASSWORD`], the signing secret is
/// fresh, and no optional gate is configured.
pub fn base_config(data_dir: &Path) -> AgentConfig {
    AgentConfig {
        data_dir: data_dir.to_path_buf(),
        tls_cert_path: data_dir.join("server.crt"),
        tls_key_path: data_dir.join("server.key"),
        password_hash: hash_password(TEST_PASSWORD).unwrap(),
        jwt_secret: generate_secret().unwrap(),
        refresh_ttl_secs: 3600,
        ..AgentConfig::default()
    }
}

/// Assemble the full router plus handles to its moving parts.
pub async fn build_agent(
    config: AgentConfig,
) -> (Router, Arc<CredentialStore>, Arc<TokenManager>) {
    init_test_logging();
    let store = Arc::new(CredentialStore::new(config.clone()).await);
    let tokens = Arc::new(TokenManager::from_config(&config).unwrap());
    let gates = GateConfig::from_config(&config);
    let app = routes::router(
        AppState {
            store: Arc::clone(&store),
            tokens: Arc::clone(&tokens),
        },
        &gates,
    );
    (app, store, tokens)
}

/// Assemble a router from defaults rooted in a fresh temp directory.
///
/// Returns the temp dir guard so the caller keeps it alive.
pub async fn default_agent() -> (Router, Arc<CredentialStore>, Arc<TokenManager>, tempfile::TempDir)
{
    let dir = tempfile::tempdir().unwrap();
    let config = base_config(dir.path());
    let (app, store, tokens) = build_agent(config).await;
    (app, store, tokens, dir)
}
