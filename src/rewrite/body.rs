//! JavaScript body rewriting.
//!
//! Google's tag scripts embed their own hostnames; replacing them with the
//! relay's public host keeps every follow-up request first-party.
//!
//! Replacements run top-to-bottom over the cumulative result, so a host
//! produced by an earlier rule can in principle be matched by a later one.
//! The order is part of the observable behavior.

use std::borrow::Cow;

use axum::body::Bytes;

/// Literal hostname fragments replaced in JavaScript bodies, in order.
///
/// The first entry is an escaped fragment of generated gtag code, not a
/// hostname. It must stay byte-for-byte as is.
pub const REWRITE_RULES: [&str; 7] = [
    "\"+(a?a+\".\":\"\")+\"analytics.google.com",
    "ssl.google-analytics.com",
    "\"+a+\".google-analytics.com",
    "www.google-analytics.com",
    "google-analytics.com",
    "www.googletagmanager.com",
    "googletagmanager.com",
];

const JAVASCRIPT_CONTENT_TYPES: [&str; 2] = ["text/javascript", "application/javascript"];

/// Whether a content-type is eligible for rewriting.
pub fn is_javascript(content_type: &str) -> bool {
    JAVASCRIPT_CONTENT_TYPES
        .iter()
        .any(|prefix| content_type.starts_with(prefix))
}

/// Rewrites Google hostnames to `public_host + route_prefix`.
#[derive(Debug, Clone)]
pub struct BodyRewriter {
    replacement: String,
}

impl BodyRewriter {
    pub fn new(public_host: &str, route_prefix: &str) -> Self {
        Self {
            replacement: format!("{}{}", public_host, route_prefix),
        }
    }

    /// Apply every rule in order.
    pub fn rewrite_text(&self, text: &str) -> String {
        REWRITE_RULES
            .iter()
            .fold(text.to_string(), |acc, needle| acc.replace(needle, &self.replacement))
    }

    /// Rewrite a decoded body when its content-type is JavaScript; anything
    /// else is returned untouched, byte for byte.
    pub fn rewrite(&self, content_type: &str, body: Bytes) -> Bytes {
        if !is_javascript(content_type) {
            return body;
        }

        let text = String::from_utf8_lossy(&body);
        if let Cow::Owned(_) = text {
            tracing::warn!(content_type, "JavaScript body is not valid UTF-8, rewriting lossily");
        }

        Bytes::from(self.rewrite_text(&text))
    }
}
