// ABOUTME: Security response headers applied to every response by the first gate
// ABOUTME: Hardened defaults for a TLS-only JSON API that serves no HTML
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Security Headers
//!
//! The header set the first gate stamps onto every response, including gate
//! denials. The agent serves JSON only and always over TLS, so the defaults
//! lock everything down: no framing, no sniffing, no browser features, and
//! a long HSTS lifetime.

use std::collections::HashMap;

/// Security headers configuration
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    /// Content-Security-Policy header value
    pub csp: String,
    /// X-Frame-Options header value
    pub frame_options: String,
    /// X-Content-Type-Options header value
    pub content_type_options: String,
    /// Referrer-Policy header value
    pub referrer_policy: String,
    /// Permissions-Policy header value
    pub permissions_policy: String,
    /// Strict-Transport-Security header value; None drops the header
    pub hsts: Option<String>,
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self {
            // The agent serves no HTML; deny every source category
            csp: "default-src 'none'; frame-ancestors 'none'; base-uri 'none'".into(),
            frame_options: "DENY".into(),
            content_type_options: "nosniff".into(),
            referrer_policy: "no-referrer".into(),
            permissions_policy: "geolocation=(), microphone=(), camera=(), payment=(), usb=()"
                .into(),
            // The listener is TLS-only, so HSTS is always safe to assert
            hsts: Some("max-age=31536000; includeSubDomains".into()),
        }
    }
}

impl SecurityHeaders {
    /// Convert to a header map for application to responses.
    #[must_use]
    pub fn to_headers(&self) -> HashMap<&'static str, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Security-Policy", self.csp.clone());
        headers.insert("X-Frame-Options", self.frame_options.clone());
        headers.insert("X-Content-Type-Options", self.content_type_options.clone());
        headers.insert("Referrer-Policy", self.referrer_policy.clone());
        headers.insert("Permissions-Policy", self.permissions_policy.clone());
        if let Some(hsts) = &self.hsts {
            headers.insert("Strict-Transport-Security", hsts.clone());
        }
        headers
    }
}
