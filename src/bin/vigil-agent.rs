// ABOUTME: Agent binary: loads the record, provisions certificates, runs the TLS server
// ABOUTME: Also exposes one-shot modes for certificate generation and password hashing
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Vigil Agent Binary
//!
//! Starts the locally-hosted monitoring agent: TLS listener, access
//! gates, token issuance, and the metric collectors behind them.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use vigil_agent::config::{hash_password, AgentConfig};
use vigil_agent::server::AgentServer;
use vigil_agent::{logging, tls};

#[derive(Parser)]
#[command(name = "vigil-agent")]
#[command(about = "Vigil Agent - locally-hosted monitoring agent with TLS and token auth")]
pub struct Args {
    /// Configuration file path (created on first save when missing)
    #[arg(short, long)]
    config: Option<String>,

    /// Provision the server certificate and key, then exit
    #[arg(long)]
    gen_cert: bool,

    /// Print the bcrypt hash of the given password, then exit
    #[arg(long, value_name = "PASSWORD")]
    hash: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    if let Some(password) = args.hash {
        let hash = hash_password(&password)?;
        println!("{hash}");
        return Ok(());
    }

    let config = AgentConfig::load(args.config.as_deref().map(Path::new))?;

    if args.gen_cert {
        if tls::ensure_server_certificate(&config.tls_cert_path, &config.tls_key_path)? {
            println!(
                "wrote {} and {}",
                config.tls_cert_path.display(),
                config.tls_key_path.display()
            );
        } else {
            println!(
                "certificate already present at {}",
                config.tls_cert_path.display()
            );
        }
        return Ok(());
    }

    if let Err(e) = AgentServer::new(config).run().await {
        error!("server error: {e}");
        return Err(e.into());
    }

    Ok(())
}
