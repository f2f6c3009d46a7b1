//! Router configuration

use crate::history::HistoryOptions;
use crate::response::StatusPolicy;
use std::time::Duration;

/// Class that opts a link out of interception
pub const DEFAULT_IGNORE_CLASS: &str = "js-router--ignore";

/// Wait before the first route is evaluated when no initial fetch is made
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Origin that receives every routed request
///
/// The request for `http://app/a/b?c=1` with domain `https://api.example.com`
/// becomes `https://api.example.com/a/b?c=1`. The original URL is still used
/// for caching, history and events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    pub domain: String,
}

impl ProxyTarget {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    /// Rewrite `path_and_query` onto the proxy domain
    pub fn request_url(&self, path_and_query: &str) -> String {
        format!(
            "{}/{}",
            self.domain.trim_end_matches('/'),
            path_and_query.trim_start_matches('/')
        )
    }
}

/// Options for [`NavigationRouter`](crate::NavigationRouter)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterOptions {
    /// Fetch target markup; when off every navigation resolves to an empty `200`
    pub asynchronous: bool,
    /// Route every request through another origin
    pub proxy: Option<ProxyTarget>,
    /// Keep the first response per URL for the router's lifetime
    pub caching: bool,
    /// Dispatch `404` responses
    pub handle_404: bool,
    /// Dispatch `500` responses
    pub handle_500: bool,
    /// Links carrying this class are never intercepted
    pub ignore_class: String,
    /// Delay before the first route is evaluated without an initial fetch
    pub settle_delay: Duration,
    pub history: HistoryOptions,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            asynchronous: true,
            proxy: None,
            caching: true,
            handle_404: true,
            handle_500: true,
            ignore_class: DEFAULT_IGNORE_CLASS.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            history: HistoryOptions::default(),
        }
    }
}

impl RouterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    pub fn proxy(mut self, domain: impl Into<String>) -> Self {
        self.proxy = Some(ProxyTarget::new(domain));
        self
    }

    pub fn caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    pub fn handle_404(mut self, handle: bool) -> Self {
        self.handle_404 = handle;
        self
    }

    pub fn handle_500(mut self, handle: bool) -> Self {
        self.handle_500 = handle;
        self
    }

    pub fn ignore_class(mut self, class: impl Into<String>) -> Self {
        self.ignore_class = class.into();
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Shorthand for `history.force_hash`
    pub fn force_hash(mut self, force_hash: bool) -> Self {
        self.history.force_hash = force_hash;
        self
    }

    pub fn history(mut self, history: HistoryOptions) -> Self {
        self.history = history;
        self
    }

    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy {
            handle_404: self.handle_404,
            handle_500: self.handle_500,
        }
    }
}
