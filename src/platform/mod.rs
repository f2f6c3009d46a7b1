//! The navigation platform capability
//!
//! Everything the navigation core needs from its host environment goes
//! through [`NavigationPlatform`]: reading the address, manipulating session
//! history or the fragment, receiving clicks and history notifications,
//! fetching markup, and scheduling work on the event loop.
//!
//! Two implementations ship with the crate:
//! - [`MemoryPlatform`] keeps everything in memory. It backs headless use and
//!   every test in this crate.
//! - `BrowserPlatform` (feature `browser`, `wasm32` only) drives the real
//!   `window`/`document` through `web-sys`.

use crate::dom::ClickEvent;
use crate::error::NavigationError;
use crate::history::NavigationState;
use crate::response::HttpResponse;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;
use url::Url;

pub mod memory;

#[cfg(all(feature = "browser", target_arch = "wasm32"))]
pub mod browser;

pub use memory::{MemoryEntry, MemoryPlatform};

#[cfg(all(feature = "browser", target_arch = "wasm32"))]
pub use browser::BrowserPlatform;

/// A unit of work scheduled on the platform's event loop
pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// Pending result of a GET issued through the platform transport
pub type FetchFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, NavigationError>>>>;

/// Receives every document-level click, in the capture phase
pub type ClickListener = Rc<dyn Fn(&mut ClickEvent)>;

/// Receives a bare platform notification (popstate, hashchange)
pub type PlatformListener = Rc<dyn Fn()>;

/// Host environment primitives used by the history coordinator and router
///
/// All methods are called from the single event-loop thread. Listeners must
/// be invoked asynchronously with respect to the call that caused them
/// (`set_hash` never calls a hashchange listener re-entrantly), mirroring how
/// browsers queue these events.
pub trait NavigationPlatform {
    // --- Address ----------------------------------------------------------

    /// The current address, fragment included
    fn location(&self) -> Url;

    // --- Capabilities -----------------------------------------------------

    /// Whether a state-pushing history API is available
    fn supports_push_state(&self) -> bool;

    /// Whether fragment-change notifications are available
    fn supports_hash_change(&self) -> bool;

    // --- History primitives -----------------------------------------------

    /// Add a session history entry for `url` carrying `state`
    fn push_state(&self, state: &NavigationState, title: &str, url: &str);

    fn history_back(&self);

    fn history_forward(&self);

    // --- Fragment primitives ----------------------------------------------

    /// Assign the fragment (without the leading `#`)
    fn set_hash(&self, fragment: &str);

    // --- Document ---------------------------------------------------------

    /// Markup of the currently loaded document
    fn serialize_document(&self) -> String;

    // --- Transport --------------------------------------------------------

    /// Issue one GET for `url`
    fn fetch(&self, url: &str) -> FetchFuture;

    // --- Scheduling -------------------------------------------------------

    /// Run `task` on the event loop
    fn spawn_local(&self, task: LocalTask);

    /// A future resolving after `duration`
    fn delay(&self, duration: Duration) -> LocalTask;

    // --- Event sources ----------------------------------------------------

    fn on_click(&self, listener: ClickListener);

    fn on_popstate(&self, listener: PlatformListener);

    fn on_hashchange(&self, listener: PlatformListener);
}
