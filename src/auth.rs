// ABOUTME: HS256 access/refresh token issuance and verification
// ABOUTME: Stateless token pairs bound to the shared signing secret, zero-leeway expiry
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright (c) 2025 Vigil Agent Contributors

//! # Token Manager
//!
//! Issues and verifies the agent's HS256 token pairs. Access and refresh
//! tokens are structurally identical; only the `token_use` claim and the
//! lifetime differ. Verification is stateless (no revocation list) and its
//! external failure signal is uniform: callers learn that a token is
//! invalid, never why. The reason lands in the debug log instead.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AgentConfig;
use crate::errors::{AgentError, AgentResult};

/// What a token is good for. Wrong-use tokens are rejected wherever a
/// specific use is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    /// Short-lived token accepted by the bearer gate.
    Access,
    /// Long-lived token accepted only by the refresh endpoint.
    Refresh,
}

impl TokenUse {
    /// Claim value as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Signed claims carried by every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated username.
    pub sub: String,
    /// Access or refresh.
    pub token_use: TokenUse,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch. Checked with zero leeway.
    pub exp: i64,
}

/// An access/refresh pair issued together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived token for the bearer gate.
    pub access_token: String,
    /// Long-lived token for `POST /api/auth/refresh`.
    pub refresh_token: String,
}

/// Issues and verifies HS256 token pairs against the shared secret.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenManager {
    /// Build a manager from the signing secret and the two lifetimes.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Config` when the secret is empty.
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> AgentResult<Self> {
        if secret.is_empty() {
            return Err(AgentError::config("token signing secret must not be empty"));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        })
    }

    /// Build a manager straight from the configuration record.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Config` when the record carries no secret.
    pub fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        Self::new(&config.jwt_secret, config.access_ttl(), config.refresh_ttl())
    }

    /// Sign a single token for `subject` with the lifetime of its use.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Internal` when signing fails.
    pub fn issue(&self, subject: &str, token_use: TokenUse) -> AgentResult<String> {
        let ttl = match token_use {
            TokenUse::Access => self.access_ttl,
            TokenUse::Refresh => self.refresh_ttl,
        };
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_owned(),
            token_use,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AgentError::internal(format!("token signing failed: {e}")))
    }

    /// Issue a fresh access/refresh pair for `subject`.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Internal` when signing fails.
    pub fn issue_pair(&self, subject: &str) -> AgentResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(subject, TokenUse::Access)?,
            refresh_token: self.issue(subject, TokenUse::Refresh)?,
        })
    }

    /// Verify structure, signature, and expiry, and return the claims.
    ///
    /// Callers that require a specific use still check `token_use`
    /// themselves; this method only proves the token is ours and alive.
    ///
    /// # Errors
    ///
    /// Returns the uniform `AgentError::InvalidToken` for every failure
    /// mode. The distinction is logged at debug level only.
    pub fn verify(&self, token: &str) -> AgentResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("token rejected: {}", describe_jwt_error(&e));
                AgentError::InvalidToken
            })
    }

    /// Exchange a live refresh token for a fresh pair.
    ///
    /// The old refresh token is not revoked; it stays valid until its own
    /// expiry.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::InvalidToken` for a dead or wrong-use token and
    /// `AgentError::Internal` when signing the new pair fails.
    pub fn refresh(&self, refresh_token: &str) -> AgentResult<TokenPair> {
        let claims = self.verify(refresh_token)?;
        if claims.token_use != TokenUse::Refresh {
            debug!("refresh rejected: presented token_use is {}", claims.token_use.as_str());
            return Err(AgentError::InvalidToken);
        }
        self.issue_pair(&claims.sub)
    }
}

/// Stable description of a verification failure for the debug log.
fn describe_jwt_error(err: &jsonwebtoken::errors::Error) -> &'static str {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => "expired",
        ErrorKind::InvalidSignature => "invalid signature",
        ErrorKind::InvalidToken => "not a valid token structure",
        ErrorKind::Base64(_) => "invalid base64 encoding",
        ErrorKind::Json(_) => "invalid claims payload",
        ErrorKind::Utf8(_) => "invalid UTF-8 in claims",
        _ => "verification failed",
    }
}
