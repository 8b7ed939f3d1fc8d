// ABOUTME: Main library entry point for the Vigil monitoring agent
// ABOUTME: Exposes host metrics over an authenticated, TLS-terminated HTTP API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

#![deny(unsafe_code)]

//! # Vigil Agent
//!
//! A locally-hosted monitoring agent that exposes host metrics (CPU, memory,
//! disk, network, processes, services, container and login sessions) over an
//! authenticated HTTPS API.
//!
//! ## Features
//!
//! - **Self-provisioned TLS**: generates its own 4096-bit RSA server
//!   certificate on first boot, with optional client-certificate (mTLS)
//!   enforcement against a configured CA pool
//! - **Layered access control**: network allowlist, pre-shared client key,
//!   and JWT bearer tokens, applied as ordered middleware gates
//! - **Single administrative principal**: bcrypt-hashed credentials with an
//!   authenticated rotation endpoint
//! - **Zero-dependency deployment**: one binary, one YAML file, all secrets
//!   generated and persisted on first run
//!
//! ## Quick Start
//!
//! 1. Start the agent: `vigil-agent --config vigil.yml`
//! 2. Log in with the default credentials (`admin` / `admin`) at
//!    `POST /api/auth/login` and rotate them immediately
//! 3. Poll `GET /api/metrics` or subscribe to `GET /api/metrics/stream`
//!
//! ## Architecture
//!
//! - **Config**: layered configuration (defaults, YAML record, environment)
//!   with atomic persistence and secret bootstrap
//! - **Auth**: HS256 access/refresh token issuance and verification
//! - **TLS**: certificate provisioning and rustls server configuration
//! - **Middleware**: the ordered gate chain every request traverses
//! - **Collect**: host metric and OS-entity collection
//! - **Routes**: HTTP surface wiring the gates to the handlers

/// HS256 access/refresh token issuance and verification
pub mod auth;

/// Host metric and OS-entity collection
pub mod collect;

/// Layered configuration, credential store, and persistence
pub mod config;

/// Error taxonomy and HTTP response mapping
pub mod errors;

/// Structured logging initialization
pub mod logging;

/// Ordered access gates applied to every request
pub mod middleware;

/// HTTP surface: router assembly and handlers
pub mod routes;

/// Security response headers applied to every response
pub mod security;

/// TLS bootstrap and the serve loop
pub mod server;

/// Certificate provisioning and rustls configuration
pub mod tls;
