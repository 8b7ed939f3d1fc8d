// ABOUTME: The ordered access gates every request traverses before reaching a handler
// ABOUTME: Security headers, network allowlist, pre-shared client key, and bearer-token verification

//! Access gates, in the order the router applies them:
//!
//! 1. security headers (unconditional, response-side)
//! 2. request identity tagging and latency logging (tower-http layers,
//!    wired in the router)
//! 3. panic containment (tower-http, wired in the router)
//! 4. network allowlist
//! 5. pre-shared client key (`/api` prefix)
//! 6. bearer token (protected routes)
//!
//! A request denied at gate N never reaches gate N+1, but always passes
//! back through the response side of the gates before it.

pub mod allowlist;
pub mod auth;
pub mod client_key;
pub mod headers;

pub use allowlist::{allowlist_gate, Allowlist};
pub use auth::{require_access_token, AuthenticatedUser};
pub use client_key::{client_key_gate, ClientKeyPolicy};
pub use headers::{security_header_map, security_headers_gate};
