//! In-memory navigation platform
//!
//! [`MemoryPlatform`] models a browser tab without a browser: a session
//! history stack, a fragment, a click source, a scripted transport and a FIFO
//! event loop. Nothing runs until the owner drives the loop with
//! [`MemoryPlatform::run_until_idle`] or [`MemoryPlatform::run_next`], which
//! makes the ordering of asynchronous steps observable.
//!
//! # Example
//!
//! ```
//! use pjax_navigator::{HttpResponse, MemoryPlatform, NavigationPlatform};
//!
//! let platform = MemoryPlatform::new("http://example.com/").unwrap();
//! platform.respond("http://example.com/about", HttpResponse::ok("<h1>About</h1>"));
//!
//! platform.set_hash("/about");
//! assert_eq!(platform.current_url(), "http://example.com/#/about");
//! assert_eq!(platform.pending_jobs(), 1); // the queued hashchange
//! ```

use super::{
    ClickListener, FetchFuture, LocalTask, NavigationPlatform, PlatformListener,
};
use crate::dom::{ClickEvent, Element};
use crate::error::NavigationError;
use crate::history::NavigationState;
use crate::response::HttpResponse;
use crate::trace_log;
use futures_util::task::noop_waker_ref;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::task::Context;
use std::time::Duration;
use url::Url;

/// One session history entry
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub url: Url,
    pub state: Option<NavigationState>,
}

/// Queued event-loop work
enum Job {
    Task(LocalTask),
    PopState,
    HashChange,
}

/// Result of running one job
enum Step {
    Ran,
    Stalled,
    Empty,
}

/// Session history stack
#[derive(Debug)]
struct SessionHistory {
    entries: Vec<MemoryEntry>,
    current: usize,
}

impl SessionHistory {
    fn new(url: Url) -> Self {
        Self {
            entries: vec![MemoryEntry { url, state: None }],
            current: 0,
        }
    }

    fn current(&self) -> &MemoryEntry {
        &self.entries[self.current]
    }

    /// Push a new entry, dropping any forward history
    fn push(&mut self, entry: MemoryEntry) {
        self.entries.truncate(self.current + 1);
        self.entries.push(entry);
        self.current += 1;
    }

    /// Move by one entry; returns (from, to) when the move happened
    fn step(&mut self, back: bool) -> Option<(Url, Url)> {
        let target = if back {
            self.current.checked_sub(1)?
        } else {
            let next = self.current + 1;
            (next < self.entries.len()).then_some(next)?
        };

        let from = self.current().url.clone();
        self.current = target;
        Some((from, self.current().url.clone()))
    }
}

/// Transport script and bookkeeping
#[derive(Default)]
struct Transport {
    responses: HashMap<String, Result<HttpResponse, String>>,
    log: Vec<String>,
    delays: Vec<Duration>,
}

/// A complete [`NavigationPlatform`] living in memory
pub struct MemoryPlatform {
    push_state: bool,
    hash_change: bool,
    document: RefCell<String>,
    history: RefCell<SessionHistory>,
    transport: RefCell<Transport>,
    jobs: RefCell<VecDeque<Job>>,
    click_listeners: RefCell<Vec<ClickListener>>,
    popstate_listeners: RefCell<Vec<PlatformListener>>,
    hashchange_listeners: RefCell<Vec<PlatformListener>>,
}

impl MemoryPlatform {
    /// Create a platform whose document is loaded at `url`
    ///
    /// Both the push-state API and hashchange events are reported as
    /// supported; see [`MemoryPlatform::with_push_state`] and
    /// [`MemoryPlatform::with_hash_change`] to emulate older engines.
    pub fn new(url: &str) -> Result<Self, NavigationError> {
        let url = Url::parse(url).map_err(|err| NavigationError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        Ok(Self {
            push_state: true,
            hash_change: true,
            document: RefCell::new(String::from("<html><head></head><body></body></html>")),
            history: RefCell::new(SessionHistory::new(url)),
            transport: RefCell::new(Transport::default()),
            jobs: RefCell::new(VecDeque::new()),
            click_listeners: RefCell::new(Vec::new()),
            popstate_listeners: RefCell::new(Vec::new()),
            hashchange_listeners: RefCell::new(Vec::new()),
        })
    }

    pub fn with_push_state(mut self, supported: bool) -> Self {
        self.push_state = supported;
        self
    }

    pub fn with_hash_change(mut self, supported: bool) -> Self {
        self.hash_change = supported;
        self
    }

    pub fn with_document(self, markup: impl Into<String>) -> Self {
        *self.document.borrow_mut() = markup.into();
        self
    }

    // ------------------------------------------------------------------
    // Transport script
    // ------------------------------------------------------------------

    /// Answer GETs for `url` with `response`
    ///
    /// Unscripted URLs answer `404`.
    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.transport
            .borrow_mut()
            .responses
            .insert(url.to_string(), Ok(response));
    }

    /// Make GETs for `url` fail at the transport level
    pub fn fail(&self, url: &str, message: impl Into<String>) {
        self.transport
            .borrow_mut()
            .responses
            .insert(url.to_string(), Err(message.into()));
    }

    /// Every URL requested so far, in order
    pub fn fetch_log(&self) -> Vec<String> {
        self.transport.borrow().log.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.transport.borrow().log.len()
    }

    /// Every delay requested so far, in order
    pub fn requested_delays(&self) -> Vec<Duration> {
        self.transport.borrow().delays.clone()
    }

    // ------------------------------------------------------------------
    // Session history inspection
    // ------------------------------------------------------------------

    pub fn current_url(&self) -> String {
        self.history.borrow().current().url.to_string()
    }

    pub fn current_entry(&self) -> MemoryEntry {
        self.history.borrow().current().clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().entries.len()
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Deliver a click on `target` to every click listener
    ///
    /// Returns the event so callers can inspect `default_prevented`.
    pub fn click(&self, target: Rc<Element>) -> ClickEvent {
        self.dispatch_click(ClickEvent::new(target))
    }

    /// Deliver an already built click event
    pub fn dispatch_click(&self, mut event: ClickEvent) -> ClickEvent {
        let listeners = self.click_listeners.borrow().clone();
        for listener in listeners {
            listener(&mut event);
        }
        event
    }

    /// Type a fragment into the address bar (same as `set_hash`)
    pub fn navigate_hash(&self, fragment: &str) {
        self.set_hash(fragment);
    }

    /// Queue a popstate without moving through history
    ///
    /// Engines commonly emit one of these on initial page load.
    pub fn emit_popstate(&self) {
        self.jobs.borrow_mut().push_back(Job::PopState);
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    pub fn pending_jobs(&self) -> usize {
        self.jobs.borrow().len()
    }

    /// Run the oldest queued job; returns `false` when the queue was empty
    pub fn run_next(&self) -> bool {
        !matches!(self.step(), Step::Empty)
    }

    /// Run queued jobs until the queue is empty or only stalled tasks remain
    ///
    /// Returns the number of jobs that completed.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        let mut stalled = 0;

        while stalled < self.pending_jobs() {
            match self.step() {
                Step::Ran => {
                    ran += 1;
                    stalled = 0;
                }
                Step::Stalled => stalled += 1,
                Step::Empty => break,
            }
        }

        ran
    }

    fn step(&self) -> Step {
        let next = self.jobs.borrow_mut().pop_front();
        let Some(job) = next else {
            return Step::Empty;
        };

        match job {
            Job::Task(mut task) => {
                let mut cx = Context::from_waker(noop_waker_ref());
                if task.as_mut().poll(&mut cx).is_pending() {
                    self.jobs.borrow_mut().push_back(Job::Task(task));
                    return Step::Stalled;
                }
            }
            Job::PopState => {
                let listeners = self.popstate_listeners.borrow().clone();
                listeners.iter().for_each(|listener| listener());
            }
            Job::HashChange => {
                let listeners = self.hashchange_listeners.borrow().clone();
                listeners.iter().for_each(|listener| listener());
            }
        }

        Step::Ran
    }

    fn traverse(&self, back: bool) {
        let moved = self.history.borrow_mut().step(back);
        let Some((from, to)) = moved else {
            trace_log!("history traversal out of range");
            return;
        };

        let mut jobs = self.jobs.borrow_mut();
        jobs.push_back(Job::PopState);
        if from.fragment() != to.fragment() {
            jobs.push_back(Job::HashChange);
        }
    }

    fn resolve(&self, url: &str) -> Option<Url> {
        let base = self.location();
        base.join(url).ok()
    }
}

impl NavigationPlatform for MemoryPlatform {
    fn location(&self) -> Url {
        self.history.borrow().current().url.clone()
    }

    fn supports_push_state(&self) -> bool {
        self.push_state
    }

    fn supports_hash_change(&self) -> bool {
        self.hash_change
    }

    fn push_state(&self, state: &NavigationState, _title: &str, url: &str) {
        let Some(url) = self.resolve(url) else {
            trace_log!("push_state ignored unresolvable url '{}'", url);
            return;
        };

        self.history.borrow_mut().push(MemoryEntry {
            url,
            state: Some(state.clone()),
        });
    }

    fn history_back(&self) {
        self.traverse(true);
    }

    fn history_forward(&self) {
        self.traverse(false);
    }

    fn set_hash(&self, fragment: &str) {
        let mut url = self.location();
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);

        if url.fragment() == Some(fragment) {
            return;
        }

        url.set_fragment(Some(fragment));
        self.history
            .borrow_mut()
            .push(MemoryEntry { url, state: None });
        self.jobs.borrow_mut().push_back(Job::HashChange);
    }

    fn serialize_document(&self) -> String {
        self.document.borrow().clone()
    }

    fn fetch(&self, url: &str) -> FetchFuture {
        let mut transport = self.transport.borrow_mut();
        transport.log.push(url.to_string());

        let result = match transport.responses.get(url) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(NavigationError::transport(url, message)),
            None => Ok(HttpResponse::new(404, "Not Found")),
        };

        Box::pin(std::future::ready(result))
    }

    fn spawn_local(&self, task: LocalTask) {
        self.jobs.borrow_mut().push_back(Job::Task(task));
    }

    fn delay(&self, duration: Duration) -> LocalTask {
        self.transport.borrow_mut().delays.push(duration);
        Box::pin(async {})
    }

    fn on_click(&self, listener: ClickListener) {
        self.click_listeners.borrow_mut().push(listener);
    }

    fn on_popstate(&self, listener: PlatformListener) {
        self.popstate_listeners.borrow_mut().push(listener);
    }

    fn on_hashchange(&self, listener: PlatformListener) {
        self.hashchange_listeners.borrow_mut().push(listener);
    }
}
