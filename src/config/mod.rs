// ABOUTME: Configuration management module for the agent's persisted record and credentials
// ABOUTME: Handles layered loading, secret bootstrap, atomic persistence, and the credential store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors
//! Configuration module for the Vigil agent
//!
//! This module owns the single persisted record the agent runs from:
//!
//! - **Settings**: the YAML record with layered loading (compiled defaults,
//!   file, environment overrides) and atomic write-back
//! - **Credentials**: bcrypt hashing primitives and the shared credential
//!   store that serves verification and rotation

/// Credential hashing and the shared credential store
pub mod credentials;
/// The persisted configuration record and its load/save cycle
pub mod settings;

pub use credentials::{hash_password, verify_password, CredentialStore};
pub use settings::{generate_secret, mask_secret, AgentConfig};
