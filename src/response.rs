//! Fetched responses and the write-once response cache

use crate::trace_log;
use std::collections::HashMap;

/// A response as observed by the router: status code and markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `200 OK` with the given markup
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    /// The empty `200` used when the router runs without a transport
    pub fn synthetic() -> Self {
        Self::ok(String::new())
    }
}

/// Which statuses the router dispatches
///
/// `200` is always handled; `404` and `500` only when enabled. Everything
/// else is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    pub handle_404: bool,
    pub handle_500: bool,
}

impl StatusPolicy {
    pub fn accepts(&self, status: u16) -> bool {
        match status {
            200 => true,
            404 => self.handle_404,
            500 => self.handle_500,
            _ => false,
        }
    }
}

/// Responses keyed by original (pre-proxy) URL
///
/// Write-once: the first entry for a URL is kept for the lifetime of the
/// cache. There is no invalidation and no expiry.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    enabled: bool,
    entries: HashMap<String, HttpResponse>,
}

impl ResponseCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, url: &str) -> Option<&HttpResponse> {
        self.entries.get(url)
    }

    /// Store `response` unless caching is off or `url` already has an entry
    ///
    /// Returns whether the entry was written.
    pub fn store(&mut self, url: &str, response: &HttpResponse) -> bool {
        if !self.enabled || self.entries.contains_key(url) {
            return false;
        }
        trace_log!("caching {} response for {}", response.status, url);
        self.entries.insert(url.to_string(), response.clone());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
