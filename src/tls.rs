// ABOUTME: TLS bootstrap: self-signed certificate provisioning and rustls server configuration
// ABOUTME: Generates 4096-bit RSA server certs on first boot and loads the optional client CA pool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

//! # TLS Bootstrap
//!
//! The agent terminates its own TLS. On first boot it provisions a
//! self-signed server certificate good for local deployments (loopback and
//! `localhost` SANs, ten-year validity) and writes both PEM files with
//! owner-only permissions. When mTLS is required, the configured client CA
//! bundle is loaded into a root store and every connection must present a
//! certificate that verifies against it.
//!
//! Everything here is fatal at startup: a server that cannot establish its
//! trust material must not serve.

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, SerialNumber,
};
use ring::rand::{SecureRandom, SystemRandom};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::config::settings::write_owner_only;
use crate::config::AgentConfig;
use crate::errors::{AgentError, AgentResult};

const RSA_KEY_BITS: usize = 4096;
const CERT_COMMON_NAME: &str = "vigil-agent";
// Backdated so fresh certs validate on hosts with modest clock drift.
const NOT_BEFORE_SKEW_MINUTES: i64 = 5;
const VALIDITY_DAYS: i64 = 3650;

/// Make sure the server certificate and key exist, generating both when
/// either is missing. Returns whether generation ran.
///
/// # Errors
///
/// Returns `AgentError::TrustConfig` when generation or writing fails.
pub fn ensure_server_certificate(cert_path: &Path, key_path: &Path) -> AgentResult<bool> {
    if cert_path.exists() && key_path.exists() {
        debug!("server certificate already present at {}", cert_path.display());
        return Ok(false);
    }
    generate_self_signed(cert_path, key_path)?;
    Ok(true)
}

fn generate_self_signed(cert_path: &Path, key_path: &Path) -> AgentResult<()> {
    info!("generating self-signed server certificate ({RSA_KEY_BITS}-bit RSA)");

    let mut rng = rand::rngs::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
        .map_err(|e| AgentError::trust(format!("generate RSA key: {e}")))?;
    let key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| AgentError::trust(format!("encode private key: {e}")))?;
    let key_pair = KeyPair::from_pem(&key_pem)
        .map_err(|e| AgentError::trust(format!("load generated key: {e}")))?;

    let mut params = CertificateParams::new(vec![
        "localhost".to_owned(),
        "127.0.0.1".to_owned(),
        "::1".to_owned(),
    ])
    .map_err(|e| AgentError::trust(format!("certificate parameters: {e}")))?;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, CERT_COMMON_NAME);
    params.distinguished_name = dn;
    params.serial_number = Some(random_serial()?);
    let now = OffsetDateTime::now_utc();
    params.not_before = now - Duration::minutes(NOT_BEFORE_SKEW_MINUTES);
    params.not_after = now + Duration::days(VALIDITY_DAYS);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.is_ca = IsCa::ExplicitNoCa;

    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| AgentError::trust(format!("sign certificate: {e}")))?;

    write_owner_only(cert_path, cert.pem().as_bytes())
        .map_err(|e| AgentError::trust(format!("write {}: {e}", cert_path.display())))?;
    write_owner_only(key_path, key_pem.as_bytes())
        .map_err(|e| AgentError::trust(format!("write {}: {e}", key_path.display())))?;

    info!(
        cert = %cert_path.display(),
        key = %key_path.display(),
        "server certificate written"
    );
    Ok(())
}

/// 128-bit random serial, as CAs mint them.
fn random_serial() -> AgentResult<SerialNumber> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes)
        .map_err(|_| AgentError::internal("system RNG failure"))?;
    Ok(SerialNumber::from_slice(&bytes))
}

/// Load the client CA bundle into a root store for the mTLS verifier.
///
/// Unusable blocks are skipped the way stdlib pool loaders do; a file that
/// yields no usable certificate at all is an error.
///
/// # Errors
///
/// Returns `AgentError::TrustConfig` when the file is unreadable,
/// structurally invalid, or contains no valid certificate.
pub fn load_client_trust_pool(path: &Path) -> AgentResult<RootCertStore> {
    let data = fs::read(path)
        .map_err(|e| AgentError::trust(format!("read client CA {}: {e}", path.display())))?;
    let mut reader = BufReader::new(data.as_slice());
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AgentError::trust(format!("parse client CA {}: {e}", path.display())))?;

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(AgentError::trust(format!(
            "no valid certificates in {}",
            path.display()
        )));
    }
    if ignored > 0 {
        debug!("{ignored} unusable certificates ignored in {}", path.display());
    }
    Ok(roots)
}

/// Build the rustls server configuration from the loaded record.
///
/// mTLS engages only when `require_client_ca` is set and a CA path is
/// configured; the verifier then demands a verified client certificate on
/// every connection. ALPN advertises h2 and http/1.1.
///
/// # Errors
///
/// Returns `AgentError::TrustConfig` when certificate, key, or CA pool are
/// unusable.
pub fn build_server_config(config: &AgentConfig) -> AgentResult<ServerConfig> {
    let certs = load_cert_chain(&config.tls_cert_path)?;
    let key = load_private_key(&config.tls_key_path)?;

    let client_roots = if config.require_client_ca {
        config
            .client_ca_path
            .as_deref()
            .map(load_client_trust_pool)
            .transpose()?
    } else {
        None
    };

    let builder = ServerConfig::builder();
    let mut tls = match client_roots {
        Some(roots) => {
            let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
                .build()
                .map_err(|e| AgentError::trust(format!("client verifier: {e}")))?;
            info!("mTLS enabled: connections require a verified client certificate");
            builder.with_client_cert_verifier(verifier)
        }
        None => builder.with_no_client_auth(),
    }
    .with_single_cert(certs, key)
    .map_err(|e| AgentError::trust(format!("server certificate rejected: {e}")))?;

    tls.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(tls)
}

fn load_cert_chain(path: &Path) -> AgentResult<Vec<CertificateDer<'static>>> {
    let file = fs::File::open(path)
        .map_err(|e| AgentError::trust(format!("open {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AgentError::trust(format!("parse {}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(AgentError::trust(format!(
            "no certificates in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> AgentResult<PrivateKeyDer<'static>> {
    let file = fs::File::open(path)
        .map_err(|e| AgentError::trust(format!("open {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| AgentError::trust(format!("parse {}: {e}", path.display())))?
        .ok_or_else(|| AgentError::trust(format!("no private key in {}", path.display())))
}
