// ABOUTME: TLS server lifecycle: certificate provisioning, bind, serve, graceful drain
// ABOUTME: Owns the startup order so every gate is in place before the listener opens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

//! Server assembly and lifecycle.
//!
//! Startup order matters: certificates are provisioned before the TLS
//! config is built, the credential store and token manager are built
//! before the router, and the listener only opens once every gate is in
//! place. Shutdown drains in-flight requests for a bounded period; open
//! SSE streams are cut when the drain window closes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tracing::{info, warn};

use crate::auth::TokenManager;
use crate::config::{mask_secret, AgentConfig, CredentialStore};
use crate::errors::{AgentError, AgentResult};
use crate::routes::{self, AppState, GateConfig};
use crate::tls;

/// Bounded drain window after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// The assembled agent server.
pub struct AgentServer {
    config: AgentConfig,
}

impl AgentServer {
    /// Wrap a loaded configuration record.
    #[must_use]
    pub const fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Provision certificates, assemble the router, and serve until a
    /// shutdown signal drains the listener.
    ///
    /// # Errors
    ///
    /// Returns an error when certificate provisioning or TLS assembly
    /// fails, when the listen address does not parse, or when the
    /// listener itself fails.
    pub async fn run(self) -> AgentResult<()> {
        let config = self.config;

        if tls::ensure_server_certificate(&config.tls_cert_path, &config.tls_key_path)? {
            info!(
                "generated self-signed certificate at {}",
                config.tls_cert_path.display()
            );
        }
        let tls_config = tls::build_server_config(&config)?;

        let addr: SocketAddr = config
            .listen_address
            .parse()
            .map_err(|e| AgentError::config(format!("listen address {}: {e}", config.listen_address)))?;

        let store = Arc::new(CredentialStore::new(config.clone()).await);
        let tokens = Arc::new(TokenManager::from_config(&config)?);
        let gates = GateConfig::from_config(&config);

        log_startup(&config, &gates, addr);
        if store.default_credentials() {
            warn!("default credentials in effect, rotate via POST /api/auth/change_credentials");
        }

        let app = routes::router(
            AppState {
                store,
                tokens,
            },
            &gates,
        );

        let handle = Handle::new();
        tokio::spawn(shutdown_signal(handle.clone()));

        let rustls_config = RustlsConfig::from_config(Arc::new(tls_config));
        info!("listening on https://{addr}");
        axum_server::bind_rustls(addr, rustls_config)
            .handle(handle)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|e| AgentError::internal(format!("server: {e}")))?;

        info!("listener closed, shutdown complete");
        Ok(())
    }
}

/// Announce the effective configuration, secrets masked.
fn log_startup(config: &AgentConfig, gates: &GateConfig, addr: SocketAddr) {
    info!("=== Vigil Agent ===");
    info!("Listen:        https://{addr}");
    info!("Data dir:      {}", config.data_dir.display());
    info!("Certificate:   {}", config.tls_cert_path.display());
    info!("Private key:   {}", config.tls_key_path.display());
    match (&config.client_ca_path, config.require_client_ca) {
        (Some(ca), true) => info!("Client certs:  required, CA bundle {}", ca.display()),
        (Some(ca), false) => info!("Client certs:  CA bundle {} configured but not required", ca.display()),
        (None, true) => warn!("Client certs:  required but no CA bundle configured, requirement skipped"),
        (None, false) => info!("Client certs:  not required"),
    }
    if gates.allowlist.is_empty() {
        info!("Allowlist:     disabled (all source addresses accepted)");
    } else {
        info!("Allowlist:     {} network(s)", gates.allowlist.len());
    }
    if gates.client_key.enabled() {
        info!("Client key:    required on /api");
    } else {
        info!("Client key:    not configured");
    }
    info!(
        "Token TTLs:    access {}s, refresh {}s",
        config.access_ttl_secs, config.refresh_ttl_secs
    );
    info!("Signing key:   {}", mask_secret(&config.jwt_secret, 4));
}

/// Wait for SIGINT or SIGTERM, then start the bounded drain.
async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("could not install SIGINT handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("could not install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!(
        "shutdown signal received, draining for up to {}s",
        SHUTDOWN_GRACE.as_secs()
    );
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
