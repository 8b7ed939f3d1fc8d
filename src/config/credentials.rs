// ABOUTME: Bcrypt credential hashing and the shared credential store
// ABOUTME: Serves login verification and serialized credential rotation with best-effort persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

//! Credential hashing and the shared credential store.
//!
//! The store is the only mutable shared state in the agent. Reads (login
//! verification) take the read lock just long enough to clone the hash;
//! bcrypt work always runs on the blocking pool with no lock held. Rotation
//! holds the write lock across the persist step so concurrent rotations
//! serialize and the on-disk record matches exactly one of them.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tokio::task;
use tracing::error;

use crate::config::settings::{AgentConfig, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};
use crate::errors::{AgentError, AgentResult};

/// Hash a password with bcrypt at the default cost.
///
/// # Errors
///
/// Returns `AgentError::InvalidInput` for an empty password and
/// `AgentError::Internal` when hashing itself fails.
pub fn hash_password(password: &str) -> AgentResult<String> {
    if password.is_empty() {
        return Err(AgentError::invalid_input("password must not be empty"));
    }
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AgentError::internal(format!("bcrypt hash: {e}")))
}

/// Verify a candidate against a bcrypt hash.
///
/// Empty hash or candidate verifies false rather than erroring, so a record
/// that was never initialized cannot be logged into.
#[must_use]
pub fn verify_password(hash: &str, candidate: &str) -> bool {
    if hash.is_empty() || candidate.is_empty() {
        return false;
    }
    bcrypt::verify(candidate, hash).unwrap_or(false)
}

/// Shared, mutable identity record.
pub struct CredentialStore {
    record: RwLock<AgentConfig>,
    default_credentials: AtomicBool,
}

impl CredentialStore {
    /// Wrap a loaded configuration record.
    ///
    /// Detects whether the deployment still runs on the well-known default
    /// credentials so `/api/me` can nag about it; rotation clears the flag.
    pub async fn new(config: AgentConfig) -> Self {
        let default_credentials = if config.username == DEFAULT_ADMIN_USERNAME {
            let hash = config.password_hash.clone();
            task::spawn_blocking(move || verify_password(&hash, DEFAULT_ADMIN_PASSWORD))
                .await
                .unwrap_or(false)
        } else {
            false
        };
        Self {
            record: RwLock::new(config),
            default_credentials: AtomicBool::new(default_credentials),
        }
    }

    /// Verify a username/password pair against the current record.
    ///
    /// The username check and the hash comparison both fold into one boolean
    /// so callers can answer with a uniform denial.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Internal` only when the blocking verification
    /// task itself fails, never for a wrong password.
    pub async fn verify_login(&self, username: &str, password: &str) -> AgentResult<bool> {
        let hash = {
            let record = self.record.read().await;
            if record.username != username {
                return Ok(false);
            }
            record.password_hash.clone()
        };
        let password = password.to_owned();
        task::spawn_blocking(move || verify_password(&hash, &password))
            .await
            .map_err(|e| AgentError::internal(format!("password verification task failed: {e}")))
    }

    /// Replace the administrative identity and persist the record.
    ///
    /// The new hash is computed before the write lock is taken; the persist
    /// step runs under the lock so concurrent rotations serialize. Returns
    /// whether the record reached disk: persistence failure degrades to
    /// best-effort (the in-memory identity still changed) and is logged at
    /// error level.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::InvalidInput` for an empty password and
    /// `AgentError::Internal` when hashing fails.
    pub async fn rotate(&self, username: &str, password: &str) -> AgentResult<bool> {
        let password = password.to_owned();
        let hash = task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AgentError::internal(format!("password hashing task failed: {e}")))??;

        let mut record = self.record.write().await;
        record.username = username.to_owned();
        record.password_hash = hash;
        self.default_credentials.store(false, Ordering::Relaxed);

        let snapshot = record.clone();
        let persisted = match task::spawn_blocking(move || snapshot.save()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("credential rotation not persisted: {e}");
                false
            }
            Err(e) => {
                error!("credential rotation persist task failed: {e}");
                false
            }
        };
        drop(record);
        Ok(persisted)
    }

    /// Whether the deployment still runs on the default credentials.
    #[must_use]
    pub fn default_credentials(&self) -> bool {
        self.default_credentials.load(Ordering::Relaxed)
    }

    /// Current administrative username.
    pub async fn username(&self) -> String {
        self.record.read().await.username.clone()
    }
}
