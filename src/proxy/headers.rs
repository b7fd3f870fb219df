//! Header hygiene for forwarded requests and responses.
//!
//! # Design Decisions
//! - Hop-by-hop headers never cross the gateway, in either direction
//! - Header names are compared case-insensitively (`HeaderName` is
//!   already lower-case)
//! - Multiple values of one header keep their order
//! - `Host` and `Content-Length` describe the inbound hop; the client
//!   recomputes them for the upstream request

use axum::http::header::{CONTENT_LENGTH, HOST};
use axum::http::{HeaderMap, HeaderName};

/// Headers meaningful for a single connection only.
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Copy of `headers` without hop-by-hop entries.
pub fn filter_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

/// Headers to send upstream for an inbound request.
pub fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = filter_hop_by_hop(headers);
    filtered.remove(HOST);
    filtered.remove(CONTENT_LENGTH);
    filtered
}
