//! History coordination
//!
//! [`HistoryCoordinator`] hides which navigation back-end the platform offers
//! and presents one normalized stream of "the URL changed through back/forward"
//! events:
//!
//! - **Native** mode pushes entries through the platform's push-state API and
//!   listens for popstate.
//! - **Hash** mode encodes the virtual route in the fragment and listens for
//!   hashchange, filtering out the changes it caused itself.
//! - **Inert** mode is used when neither is available: pushes are still
//!   recorded, but back/forward cannot be observed.
//!
//! Subscribers receive [`HistoryEvent`]s through [`HistoryCoordinator::on`].

use crate::events::{invoke_contained, EventRegistry, SubscriptionId};
use crate::platform::NavigationPlatform;
use crate::{debug_log, trace_log};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use url::Url;

/// Fragments that mean "the document itself"
const ROOT_FRAGMENTS: [&str; 2] = ["", "/"];

/// A URL the coordinator has pushed, tagged with a unique id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    pub uid: u64,
    pub url: String,
}

/// Coordinator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Use hash navigation even when the push-state API is available
    pub force_hash: bool,
}

impl HistoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_hash(mut self, force_hash: bool) -> Self {
        self.force_hash = force_hash;
        self
    }
}

/// Which back-end the coordinator drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Native,
    Hash,
    Inert,
}

impl HistoryMode {
    /// Pick a mode from platform capabilities
    pub fn detect(platform: &dyn NavigationPlatform, options: &HistoryOptions) -> Self {
        if platform.supports_push_state() && !options.force_hash {
            HistoryMode::Native
        } else if platform.supports_hash_change() {
            HistoryMode::Hash
        } else {
            HistoryMode::Inert
        }
    }
}

/// Hash-mode bookkeeping for fragment writes the coordinator made itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashSync {
    Idle,
    /// A fragment write is in flight; its hashchange must be swallowed
    AwaitingOwnChange(String),
}

// ============================================================================
// Events
// ============================================================================

/// Event kinds owned by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryEventKind {
    PopState,
    BackState,
    ForwardState,
}

impl fmt::Display for HistoryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HistoryEventKind::PopState => "popstate",
            HistoryEventKind::BackState => "backstate",
            HistoryEventKind::ForwardState => "forwardstate",
        })
    }
}

/// Event delivered to coordinator subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// The address changed through back/forward (or a user-typed fragment)
    PopState {
        /// Canonical URL, fragment encoding already undone in hash mode
        url: String,
        /// State recorded when `url` was last pushed
        state: Option<NavigationState>,
    },
    /// `go_back` was called
    BackState,
    /// `go_forward` was called
    ForwardState,
}

impl HistoryEvent {
    pub fn kind(&self) -> HistoryEventKind {
        match self {
            HistoryEvent::PopState { .. } => HistoryEventKind::PopState,
            HistoryEvent::BackState => HistoryEventKind::BackState,
            HistoryEvent::ForwardState => HistoryEventKind::ForwardState,
        }
    }
}

/// Callback type for coordinator events
pub type HistoryHandler = dyn Fn(&HistoryEvent);

// ============================================================================
// Coordinator
// ============================================================================

struct CoordinatorInner {
    platform: Rc<dyn NavigationPlatform>,
    options: HistoryOptions,
    mode: HistoryMode,
    initial_url: String,
    uid: Cell<u64>,
    states: RefCell<HashMap<String, NavigationState>>,
    hash_sync: RefCell<HashSync>,
    inert_current: RefCell<String>,
    listeners: RefCell<EventRegistry<HistoryEventKind, HistoryHandler>>,
}

/// Normalizes native and hash-based history into one event stream
///
/// Cloning yields another handle to the same coordinator.
#[derive(Clone)]
pub struct HistoryCoordinator {
    inner: Rc<CoordinatorInner>,
}

impl fmt::Debug for HistoryCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryCoordinator")
            .field("mode", &self.inner.mode)
            .field("options", &self.inner.options)
            .field("initial_url", &self.inner.initial_url)
            .field("states", &self.inner.states.borrow().len())
            .finish()
    }
}

impl HistoryCoordinator {
    /// Detect the back-end, record the landing URL and attach listeners
    pub fn new(platform: Rc<dyn NavigationPlatform>, options: HistoryOptions) -> Self {
        let mode = HistoryMode::detect(platform.as_ref(), &options);
        let initial_url = strip_fragment(&platform.location());

        let coordinator = Self {
            inner: Rc::new(CoordinatorInner {
                platform,
                options,
                mode,
                initial_url: initial_url.clone(),
                uid: Cell::new(0),
                states: RefCell::new(HashMap::new()),
                hash_sync: RefCell::new(HashSync::Idle),
                inert_current: RefCell::new(initial_url.clone()),
                listeners: RefCell::new(EventRegistry::new()),
            }),
        };

        coordinator.record(&initial_url);
        coordinator.enable();

        debug_log!("history coordinator ready in {:?} mode at {}", mode, initial_url);
        coordinator
    }

    fn enable(&self) {
        let weak = Rc::downgrade(&self.inner);

        match self.inner.mode {
            HistoryMode::Native => {
                self.inner
                    .platform
                    .on_popstate(Rc::new(move || with_coordinator(&weak, |c| c.handle_popstate())));
            }
            HistoryMode::Hash => {
                // Carry the landing URL in the fragment from the first load
                self.write_fragment(&self.inner.initial_url);
                self.inner
                    .platform
                    .on_hashchange(Rc::new(move || with_coordinator(&weak, |c| c.handle_hashchange())));
            }
            HistoryMode::Inert => {
                trace_log!("no history back-end available; back/forward will not be observed");
            }
        }
    }

    // ------------------------------------------------------------------
    // Public surface
    // ------------------------------------------------------------------

    pub fn mode(&self) -> HistoryMode {
        self.inner.mode
    }

    pub fn options(&self) -> &HistoryOptions {
        &self.inner.options
    }

    /// The landing URL with its fragment removed
    pub fn initial_url(&self) -> &str {
        &self.inner.initial_url
    }

    /// Subscribe to a coordinator event
    pub fn on<F>(&self, kind: HistoryEventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&HistoryEvent) + 'static,
    {
        let id = SubscriptionId::new(self.uid());
        self.inner
            .listeners
            .borrow_mut()
            .subscribe(kind, id, Rc::new(callback));
        id
    }

    /// Remove a subscription; returns whether it existed
    pub fn off(&self, kind: HistoryEventKind, id: SubscriptionId) -> bool {
        self.inner.listeners.borrow_mut().unsubscribe(kind, id)
    }

    /// Add `url` to history
    ///
    /// Pushing the current address is a no-op: no state is recorded and no
    /// history entry is created.
    pub fn push(&self, url: &str) {
        if url == self.current_url() {
            trace_log!("push skipped, already at {}", url);
            return;
        }

        let state = self.record(url);

        match self.inner.mode {
            HistoryMode::Native => self.inner.platform.push_state(&state, "", url),
            HistoryMode::Hash => self.write_fragment(url),
            HistoryMode::Inert => *self.inner.inert_current.borrow_mut() = url.to_string(),
        }

        debug_log!("pushed {} (uid {})", url, state.uid);
    }

    /// Go back one entry; `backstate` fires before the platform's popstate
    pub fn go_back(&self) {
        self.inner.platform.history_back();
        self.fire(&HistoryEvent::BackState);
    }

    /// Go forward one entry; `forwardstate` fires before the platform's popstate
    pub fn go_forward(&self) {
        self.inner.platform.history_forward();
        self.fire(&HistoryEvent::ForwardState);
    }

    /// Next unique id; starts at 1 and never resets
    pub fn uid(&self) -> u64 {
        let next = self.inner.uid.get() + 1;
        self.inner.uid.set(next);
        next
    }

    /// The URL the address currently stands for, fragment encoding undone
    pub fn current_url(&self) -> String {
        match self.inner.mode {
            HistoryMode::Native => self.inner.platform.location().to_string(),
            HistoryMode::Hash => canonical_from_fragment(&self.inner.platform.location()),
            HistoryMode::Inert => self.inner.inert_current.borrow().clone(),
        }
    }

    /// Latest state recorded for `url`
    pub fn state_for(&self, url: &str) -> Option<NavigationState> {
        self.inner.states.borrow().get(url).cloned()
    }

    /// Number of distinct URLs with a recorded state
    pub fn states(&self) -> usize {
        self.inner.states.borrow().len()
    }

    pub fn hash_sync(&self) -> HashSync {
        self.inner.hash_sync.borrow().clone()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn record(&self, url: &str) -> NavigationState {
        let state = NavigationState {
            uid: self.uid(),
            url: url.to_string(),
        };
        self.inner
            .states
            .borrow_mut()
            .insert(url.to_string(), state.clone());
        state
    }

    fn write_fragment(&self, url: &str) {
        let location = self.inner.platform.location();
        let fragment = encode_fragment(&location, url);

        // Writing the fragment already shown produces no hashchange
        if location.fragment() != Some(fragment.as_str()) {
            *self.inner.hash_sync.borrow_mut() = HashSync::AwaitingOwnChange(fragment.clone());
        }

        self.inner.platform.set_hash(&fragment);
    }

    fn handle_popstate(&self) {
        let url = self.inner.platform.location().to_string();
        let state = self.state_for(&url);
        self.fire(&HistoryEvent::PopState { url, state });
    }

    fn handle_hashchange(&self) {
        let location = self.inner.platform.location();
        let fragment = location.fragment().unwrap_or_default().to_string();

        let previous = self.inner.hash_sync.replace(HashSync::Idle);
        if previous == HashSync::AwaitingOwnChange(fragment.clone()) {
            trace_log!("swallowed own hashchange to #{}", fragment);
            return;
        }

        let url = canonical_from_fragment(&location);
        let state = self.state_for(&url);
        self.fire(&HistoryEvent::PopState { url, state });
    }

    fn fire(&self, event: &HistoryEvent) {
        let kind = event.kind();
        let subscribers = self.inner.listeners.borrow().snapshot(kind);
        trace_log!("firing {} to {} subscriber(s)", kind, subscribers.len());

        for subscriber in subscribers {
            invoke_contained(&kind.to_string(), || subscriber(event));
        }
    }
}

fn with_coordinator(weak: &Weak<CoordinatorInner>, f: impl FnOnce(&HistoryCoordinator)) {
    if let Some(inner) = weak.upgrade() {
        f(&HistoryCoordinator { inner });
    }
}

// ============================================================================
// URL helpers
// ============================================================================

/// The URL without its fragment
pub fn strip_fragment(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Encode `url` as a fragment relative to the document at `location`
///
/// The document's own path becomes `/`; paths below the document's
/// directory lose that prefix (`/foo/bar/` from `/foo/` becomes `/bar/`).
/// Paths outside it climb with dot segments (`/other` from `/foo/` becomes
/// `/../other`), so [`canonical_from_fragment`] always maps the fragment
/// back to `url`.
pub fn encode_fragment(location: &Url, url: &str) -> String {
    let Ok(target) = location.join(url) else {
        return url.to_string();
    };
    let path = target.path();
    let query = target.query().map(|q| format!("?{}", q)).unwrap_or_default();

    if path == location.path() {
        return format!("/{}", query);
    }

    let directory: Vec<&str> = location
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    let segments: Vec<&str> = path.split('/').skip(1).collect();
    let Some((file, parents)) = segments.split_last() else {
        return format!("{}{}", path, query);
    };

    let shared = directory
        .iter()
        .zip(parents)
        .take_while(|(a, b)| a == b)
        .count();

    let mut fragment = String::from("/");
    fragment.push_str(&"../".repeat(directory.len() - shared));
    for parent in &parents[shared..] {
        fragment.push_str(parent);
        fragment.push('/');
    }
    fragment.push_str(file);

    // "/" is reserved for the document itself
    if fragment == "/" {
        fragment.push_str("./");
    }
    fragment.push_str(&query);
    fragment
}

/// Rebuild the canonical URL a hash-mode address stands for
///
/// `http://x/foo/#/bar/` → `http://x/foo/bar/`, `http://x/foo/#/../other` →
/// `http://x/other`; the root fragments (none, `#`, `#/`) resolve to the
/// document itself.
pub fn canonical_from_fragment(location: &Url) -> String {
    let fragment = location.fragment().unwrap_or_default();
    let rest = fragment.strip_prefix('/').unwrap_or(fragment);

    let mut document = location.clone();
    document.set_fragment(None);
    document.set_query(None);

    if ROOT_FRAGMENTS.contains(&fragment) {
        return document.to_string();
    }
    if let Some(query) = rest.strip_prefix('?') {
        document.set_query(Some(query));
        return document.to_string();
    }

    document.set_path(&format!("{}/", location.path().trim_end_matches('/')));
    match document.join(&format!("./{}", rest)) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}{}", document, rest),
    }
}
