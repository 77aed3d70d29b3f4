//! The framework-agnostic request view the dispatch core operates over.

use bytes::Bytes;
use http::HeaderMap;
use std::collections::HashMap;

/// Everything the dispatch core needs from an inbound request.
///
/// The body is a [`Bytes`] handle rather than a consumable stream: cloning a
/// `Bytes` is a cheap refcount bump over the same backing buffer, so every
/// consumer (rule matching, forwarding, logging) gets its own "re-seated"
/// view without the core needing to buffer-and-reassign a reader by hand.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Uppercase HTTP method, e.g. `"GET"`.
    pub method: String,
    /// Inbound request headers.
    pub headers: HeaderMap,
    /// Query parameters, first value per key.
    pub query: HashMap<String, String>,
    /// Raw request body.
    pub body: Bytes,
}

impl DispatchRequest {
    /// First value of a header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First value of a query parameter, if present.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// Any header name starting (case-insensitively) with `beo-echo`, used by
    /// loop detection.
    pub fn has_header_prefixed(&self, prefix: &str) -> bool {
        let prefix = prefix.to_ascii_lowercase();
        self.headers.keys().any(|name| name.as_str().to_ascii_lowercase().starts_with(&prefix))
    }
}
