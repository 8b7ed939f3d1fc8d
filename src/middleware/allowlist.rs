// ABOUTME: Network allowlist gate: caller IP membership in configured CIDR ranges
// ABOUTME: Empty allowlist means the gate is disabled, never deny-all
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ipnet::IpNet;
use tracing::{debug, warn};

use crate::errors::AgentError;

/// Parsed CIDR ranges the gate checks callers against.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    networks: Vec<IpNet>,
}

impl Allowlist {
    /// Parse configured entries, skipping whatever does not parse. A config
    /// typo must never lock the operator out by turning into deny-all.
    #[must_use]
    pub fn parse(entries: &[String]) -> Self {
        let mut networks = Vec::new();
        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match entry.parse::<IpNet>() {
                Ok(net) => networks.push(net),
                Err(e) => warn!("ignoring invalid allowlist entry {entry:?}: {e}"),
            }
        }
        Self { networks }
    }

    /// Whether no valid ranges are configured (gate disabled).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Number of valid ranges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Membership check. An empty allowlist permits everyone.
    #[must_use]
    pub fn permits(&self, addr: IpAddr) -> bool {
        if self.networks.is_empty() {
            return true;
        }
        self.networks.iter().any(|net| net.contains(&addr))
    }
}

/// Deny callers outside the allowlist with a bare 403. The router only
/// mounts this gate when at least one valid range is configured.
pub async fn allowlist_gate(
    State(allowlist): State<Arc<Allowlist>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    if allowlist.permits(peer.ip()) {
        return next.run(req).await;
    }
    debug!(peer = %peer, "request refused by network allowlist");
    AgentError::AccessDenied.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn empty_allowlist_permits_everyone() {
        let allowlist = Allowlist::parse(&[]);
        assert!(allowlist.is_empty());
        assert!(allowlist.permits("192.0.2.1".parse().unwrap()));
        assert!(allowlist.permits("::1".parse().unwrap()));
    }

    #[test]
    fn membership_follows_the_ranges() {
        let allowlist = Allowlist::parse(&entries(&["10.0.0.0/8", "2001:db8::/32"]));
        assert!(allowlist.permits("10.1.2.3".parse().unwrap()));
        assert!(!allowlist.permits("192.0.2.1".parse().unwrap()));
        assert!(allowlist.permits("2001:db8::17".parse().unwrap()));
        assert!(!allowlist.permits("2001:db9::17".parse().unwrap()));
    }

    #[test]
    fn invalid_entries_are_skipped_not_fatal() {
        let allowlist = Allowlist::parse(&entries(&["not-a-cidr", "10.0.0.0/8", ""]));
        assert_eq!(allowlist.len(), 1);
        assert!(allowlist.permits("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn all_entries_invalid_degrades_to_disabled() {
        let allowlist = Allowlist::parse(&entries(&["bogus", "299.0.0.0/8"]));
        assert!(allowlist.is_empty());
        assert!(allowlist.permits("192.0.2.1".parse().unwrap()));
    }

    #[test]
    fn host_ranges_match_exactly_one_address() {
        let allowlist = Allowlist::parse(&entries(&["127.0.0.1/32"]));
        assert!(allowlist.permits("127.0.0.1".parse().unwrap()));
        assert!(!allowlist.permits("127.0.0.2".parse().unwrap()));
    }
}
