//! # PJAX Navigator
//!
//! A PJAX-style navigation core: in-app links are intercepted, the target
//! markup is fetched in the background, and the address is updated without a
//! full page load.
//!
//! - **History Coordination** - Native push-state or hash-fragment history
//!   behind one normalized `popstate` stream
//! - **Link Interception** - Same-domain links that match a route are taken over;
//!   fragments, files, new-tab and opted-out links are left alone
//! - **Route Matching** - Path patterns with parameters, constraints and wildcards
//! - **Response Caching** - Every URL is fetched at most once per router
//! - **Proxying** - Route requests through another origin
//! - **Injected Platform** - The host environment is a trait, so the whole core
//!   runs headless against [`MemoryPlatform`]
//!
//! # Quick Start
//!
//! ```
//! use pjax_navigator::*;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let platform = Rc::new(MemoryPlatform::new("http://example.com/").unwrap());
//! platform.respond("http://example.com/", HttpResponse::ok("<main>home</main>"));
//! platform.respond(
//!     "http://example.com/measurement",
//!     HttpResponse::ok("<main>measurement</main>"),
//! );
//!
//! let router = NavigationRouter::new(platform.clone(), RouterOptions::default());
//!
//! let pages = Rc::new(RefCell::new(Vec::new()));
//! let seen = Rc::clone(&pages);
//! router.get("/measurement", &RouteHandler::new(move |event| {
//!     let body = event.response.as_ref().map(|r| r.body.clone());
//!     seen.borrow_mut().push(body);
//! }));
//!
//! router.bind();
//! platform.run_until_idle();
//!
//! // A click on <a href="/measurement">
//! let event = platform.click(Rc::new(Element::anchor("/measurement")));
//! assert!(event.default_prevented());
//! platform.run_until_idle();
//!
//! assert_eq!(*pages.borrow(), vec![Some("<main>measurement</main>".to_string())]);
//! assert_eq!(platform.current_url(), "http://example.com/measurement");
//! ```
//!
//! # History Only
//!
//! ```
//! use pjax_navigator::*;
//! use std::rc::Rc;
//!
//! let platform = Rc::new(MemoryPlatform::new("http://x/foo/").unwrap());
//! let history = HistoryCoordinator::new(platform.clone(), HistoryOptions::new().force_hash(true));
//!
//! history.push("http://x/foo/bar/");
//! assert_eq!(platform.current_url(), "http://x/foo/#/bar/");
//! assert_eq!(history.current_url(), "http://x/foo/bar/");
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)
//! - `cache` (default) - LRU memoization of route pattern matches
//! - `browser` - `BrowserPlatform`, a `web-sys` backed platform (`wasm32` only)

#![doc(html_root_url = "https://docs.rs/pjax-navigator/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Cache (optional)
#[cfg(feature = "cache")]
pub mod cache;

// Core navigation modules
pub mod history;
pub mod matcher;
pub mod options;
pub mod router;

// Error handling
pub mod error;

// Host environment
pub mod dom;
pub mod platform;

// Other modules
pub mod events;
pub mod params;
pub mod response;

// Re-export main types for convenient access
#[cfg(feature = "cache")]
pub use cache::{CacheStats, MatchCache};
pub use dom::{ClickEvent, Element, ElementMatcher, Selector};
pub use error::{NavigationError, NavigationOutcome};
pub use events::SubscriptionId;
pub use history::{
    HashSync, HistoryCoordinator, HistoryEvent, HistoryEventKind, HistoryMode, HistoryOptions,
    NavigationState,
};
pub use matcher::{Constraint, RouteMatcher, RoutePattern, RouteRequest, Segment};
pub use options::{ProxyTarget, RouterOptions};
pub use params::{QueryParams, RouteParams};
#[cfg(all(feature = "browser", target_arch = "wasm32"))]
pub use platform::BrowserPlatform;
pub use platform::{MemoryEntry, MemoryPlatform, NavigationPlatform};
pub use response::{HttpResponse, ResponseCache, StatusPolicy};
pub use router::{
    ClickRejection, NavigationRouter, RouteCallback, RouteEvent, RouteHandler, RouterEventKind,
};
