// ABOUTME: The agent's persisted configuration record and its load/save cycle
// ABOUTME: Layered loading (defaults, YAML file, environment), secret bootstrap, atomic write-back
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

//! The persisted configuration record.
//!
//! Precedence on load: environment overrides > on-disk YAML record >
//! compiled defaults. Secrets absent from the record (signing secret,
//! password hash) are generated once and written back so they survive
//! restarts. Saving is atomic: the full record goes to a temp file with
//! owner-only permissions, then renames over the target.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::credentials::hash_password;
use crate::errors::{AgentError, AgentResult};

/// Username assumed when the record carries none.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Password hashed into the record when none is configured. Deployments are
/// expected to rotate it on first login.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

const SECRET_BYTES: usize = 32;

/// The full configuration record the agent runs from.
///
/// Everything here round-trips through the YAML file except `config_file`
/// itself, which records where the record came from so `save` knows where
/// to write it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Address the TLS listener binds to.
    pub listen_address: String,
    /// Directory for generated state (certificates, keys). Created 0700.
    pub data_dir: PathBuf,
    /// Server certificate path; derived from `data_dir` when empty.
    pub tls_cert_path: PathBuf,
    /// Server private key path; derived from `data_dir` when empty.
    pub tls_key_path: PathBuf,
    /// PEM bundle of client CAs for mTLS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ca_path: Option<PathBuf>,
    /// Require a verified client certificate on every connection.
    pub require_client_ca: bool,
    /// The single administrative username.
    pub username: String,
    /// Bcrypt hash of the administrative password.
    pub password_hash: String,
    /// Hex-encoded HS256 signing secret; generated when empty.
    pub jwt_secret: String,
    /// Access-token lifetime in seconds.
    pub access_ttl_secs: u64,
    /// Refresh-token lifetime in seconds.
    pub refresh_ttl_secs: u64,
    /// CIDR ranges allowed through the network gate; empty disables the gate.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_cidrs: Vec<String>,
    /// Plaintext pre-shared client key. Deprecated; kept for older records,
    /// hashed into `client_key_hash` at load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    /// Bcrypt hash of the pre-shared client key; takes precedence over the
    /// plaintext field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key_hash: Option<String>,
    /// Where this record was loaded from; `save` writes back here.
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8443".into(),
            data_dir: PathBuf::from("./data"),
            tls_cert_path: PathBuf::new(),
            tls_key_path: PathBuf::new(),
            client_ca_path: None,
            require_client_ca: false,
            username: DEFAULT_ADMIN_USERNAME.into(),
            password_hash: String::new(),
            jwt_secret: String::new(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 604_800,
            allowed_cidrs: Vec::new(),
            client_key: None,
            client_key_hash: None,
            config_file: None,
        }
    }
}

impl AgentConfig {
    /// Load the record with full precedence and secret bootstrap.
    ///
    /// A missing file is not an error: the agent starts from defaults and
    /// the first save creates it. An unreadable or unparsable file is fatal.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Config` when the file is unreadable or invalid,
    /// when the data directory cannot be created, or when secret generation
    /// fails.
    pub fn load(path: Option<&Path>) -> AgentResult<Self> {
        let mut config = Self::default();

        if let Some(path) = path {
            match fs::read_to_string(path) {
                Ok(text) => {
                    config = serde_yaml::from_str(&text).map_err(|e| {
                        AgentError::config(format!("parse {}: {e}", path.display()))
                    })?;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(
                        "config file {} not found, starting from defaults",
                        path.display()
                    );
                }
                Err(e) => {
                    return Err(AgentError::config(format!("read {}: {e}", path.display())));
                }
            }
            config.config_file = Some(path.to_path_buf());
        }

        config.apply_env_overrides();
        config.prepare_data_dir()?;
        config.bootstrap_secrets()?;

        Ok(config)
    }

    /// Environment overrides win over everything in the file. Plaintext
    /// secrets from the environment are hashed immediately and discarded.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_value("VIGIL_LISTEN") {
            self.listen_address = v;
        }
        if let Some(v) = env_value("VIGIL_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = env_value("VIGIL_TLS_CERT") {
            self.tls_cert_path = PathBuf::from(v);
        }
        if let Some(v) = env_value("VIGIL_TLS_KEY") {
            self.tls_key_path = PathBuf::from(v);
        }
        if let Some(v) = env_value("VIGIL_CLIENT_CA") {
            self.client_ca_path = Some(PathBuf::from(v));
        }
        if let Some(v) = env_value("VIGIL_REQUIRE_CLIENT_CA") {
            self.require_client_ca = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = env_value("VIGIL_USERNAME") {
            self.username = v;
        }
        if let Some(v) = env_value("VIGIL_JWT_SECRET") {
            self.jwt_secret = v;
        }
        if let Some(v) = env_value("VIGIL_ACCESS_TTL_SECS") {
            match v.parse() {
                Ok(n) => self.access_ttl_secs = n,
                Err(e) => warn!("ignoring invalid VIGIL_ACCESS_TTL_SECS: {e}"),
            }
        }
        if let Some(v) = env_value("VIGIL_REFRESH_TTL_SECS") {
            match v.parse() {
                Ok(n) => self.refresh_ttl_secs = n,
                Err(e) => warn!("ignoring invalid VIGIL_REFRESH_TTL_SECS: {e}"),
            }
        }
        if let Some(v) = env_value("VIGIL_ALLOWED_CIDRS") {
            self.allowed_cidrs = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect();
        }
        if let Some(v) = env_value("VIGIL_PASSWORD") {
            match hash_password(&v) {
                Ok(hash) => self.password_hash = hash,
                Err(e) => warn!("ignoring VIGIL_PASSWORD: {e}"),
            }
        }
        if let Some(v) = env_value("VIGIL_CLIENT_KEY") {
            match hash_password(&v) {
                Ok(hash) => self.client_key_hash = Some(hash),
                Err(e) => warn!("ignoring VIGIL_CLIENT_KEY: {e}"),
            }
        }
    }

    /// Create the data directory (owner-only) and derive default TLS paths.
    fn prepare_data_dir(&mut self) -> AgentResult<()> {
        let builder = {
            let mut builder = fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o700);
            }
            builder
        };
        builder.create(&self.data_dir).map_err(|e| {
            AgentError::config(format!("create data dir {}: {e}", self.data_dir.display()))
        })?;

        if self.tls_cert_path.as_os_str().is_empty() {
            self.tls_cert_path = self.data_dir.join("server.crt");
        }
        if self.tls_key_path.as_os_str().is_empty() {
            self.tls_key_path = self.data_dir.join("server.key");
        }
        Ok(())
    }

    /// Generate missing secrets and write them back so they survive
    /// restarts. Tokens signed with an ephemeral secret die with the
    /// process, which is worth a loud warning.
    fn bootstrap_secrets(&mut self) -> AgentResult<()> {
        let mut dirty = false;

        if self.jwt_secret.is_empty() {
            self.jwt_secret = generate_secret()?;
            info!("generated new token signing secret");
            dirty = true;
        }

        if self.password_hash.is_empty() {
            self.password_hash = hash_password(DEFAULT_ADMIN_PASSWORD)
                .map_err(|e| AgentError::config(format!("hash default password: {e}")))?;
            warn!("no password hash configured, using default credentials (unsafe for production)");
            dirty = true;
        }

        if self.client_key_hash.is_none() {
            if let Some(key) = self.client_key.as_deref() {
                if !key.is_empty() {
                    let hash = hash_password(key)
                        .map_err(|e| AgentError::config(format!("hash client key: {e}")))?;
                    self.client_key_hash = Some(hash);
                }
            }
        }

        if dirty {
            if self.config_file.is_some() {
                if let Err(e) = self.save() {
                    warn!("could not persist generated secrets: {e}");
                }
            } else {
                warn!("no config file configured, generated secrets will not survive a restart");
            }
        }
        Ok(())
    }

    /// Write the full record atomically: temp file (0600) then rename.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Persistence` when no config file path is set or
    /// when any filesystem step fails.
    pub fn save(&self) -> AgentResult<()> {
        let Some(path) = self.config_file.as_deref() else {
            return Err(AgentError::persistence("no config file path set"));
        };

        let yaml = serde_yaml::to_string(self)
            .map_err(|e| AgentError::persistence(format!("serialize config: {e}")))?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        write_owner_only(&tmp, yaml.as_bytes())
            .map_err(|e| AgentError::persistence(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, path)
            .map_err(|e| AgentError::persistence(format!("replace {}: {e}", path.display())))?;
        Ok(())
    }

    /// Access-token lifetime as a signed duration for claim arithmetic.
    #[must_use]
    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.access_ttl_secs).unwrap_or(i64::MAX))
    }

    /// Refresh-token lifetime as a signed duration for claim arithmetic.
    #[must_use]
    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.refresh_ttl_secs).unwrap_or(i64::MAX))
    }
}

/// Environment variable value, with empty treated as unset.
fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Write a file with owner-only permissions where the platform supports it.
pub(crate) fn write_owner_only(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)
}

/// Generate a fresh signing secret: 32 random bytes, hex-encoded.
///
/// # Errors
///
/// Returns `AgentError::Internal` when the system RNG fails.
pub fn generate_secret() -> AgentResult<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; SECRET_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| AgentError::internal("system RNG failure"))?;
    Ok(hex::encode(bytes))
}

/// Mask a secret for log output, keeping only a short suffix.
#[must_use]
pub fn mask_secret(secret: &str, keep: usize) -> String {
    let len = secret.chars().count();
    if len <= keep {
        return "*".repeat(len);
    }
    let suffix: String = secret.chars().skip(len - keep).collect();
    format!("****{suffix}")
}
