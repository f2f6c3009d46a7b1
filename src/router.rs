//! PJAX navigation router
//!
//! [`NavigationRouter`] intercepts in-app link clicks, fetches the target
//! markup through the platform, caches it, pushes the URL through the
//! [`HistoryCoordinator`] and tells subscribers about it.
//!
//! # Events
//!
//! - `preget` fires when a navigation starts and some route matches it
//! - `get` fires for every route handler whose patterns match the resolved URL,
//!   and for every observer registered with `on(RouterEventKind::Get, ..)`
//! - `popget` fires when the user moves through history
//!
//! # Example
//!
//! ```
//! use pjax_navigator::{
//!     HttpResponse, MemoryPlatform, NavigationRouter, RouteHandler, RouterOptions,
//! };
//! use std::rc::Rc;
//!
//! let platform = Rc::new(MemoryPlatform::new("http://example.com/").unwrap());
//! platform.respond("http://example.com/", HttpResponse::ok("<main>home</main>"));
//! platform.respond("http://example.com/about", HttpResponse::ok("<main>about</main>"));
//!
//! let router = NavigationRouter::new(platform.clone(), RouterOptions::default());
//! router.get("/about", &RouteHandler::new(|event| {
//!     assert_eq!(event.route, "/about");
//! }));
//! router.bind();
//! platform.run_until_idle();
//!
//! assert!(router.trigger("/about"));
//! platform.run_until_idle();
//! assert_eq!(platform.current_url(), "http://example.com/about");
//! ```

use crate::dom::{ClickEvent, Element, ElementMatcher};
use crate::error::{NavigationError, NavigationOutcome};
use crate::events::{invoke_contained, EventRegistry, SubscriptionId};
use crate::history::{strip_fragment, HistoryCoordinator, HistoryEvent, HistoryEventKind};
use crate::matcher::{RouteMatcher, RouteRequest};
use crate::options::RouterOptions;
use crate::params::RouteParams;
use crate::platform::NavigationPlatform;
use crate::response::{HttpResponse, ResponseCache};
use crate::{debug_log, trace_log, warn_log};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use url::Url;

/// Same-domain links to these files are left to the platform
const FILE_EXTENSIONS: [&str; 15] = [
    "jpg", "jpeg", "png", "gif", "pdf", "csv", "txt", "md", "doc", "docx", "xls", "xlsx", "webm",
    "mp4", "mp3",
];

// ============================================================================
// Events
// ============================================================================

/// Event kinds owned by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterEventKind {
    PreGet,
    Get,
    PopGet,
}

impl fmt::Display for RouterEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RouterEventKind::PreGet => "preget",
            RouterEventKind::Get => "get",
            RouterEventKind::PopGet => "popget",
        })
    }
}

/// Payload delivered with `preget`, `get` and `popget`
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEvent {
    /// Cleaned path of the URL (`/foo/` for `http://x/foo/?a=1`)
    pub route: String,
    /// The original, un-proxied URL
    pub url: String,
    /// Markup for the URL; `None` for `preget` and for uncached `popget`
    pub response: Option<HttpResponse>,
    /// Parse result of the URL against the receiving handler's patterns
    pub request: RouteRequest,
    pub status: Option<u16>,
}

/// Callback type shared by route handlers and event subscribers
pub type RouteCallback = dyn Fn(&RouteEvent);

/// A route callback with identity
///
/// Binding the same handler to several patterns with
/// [`NavigationRouter::get`] enrolls it once; clones share that identity.
#[derive(Clone)]
pub struct RouteHandler(Rc<RouteCallback>);

impl RouteHandler {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&RouteEvent) + 'static,
    {
        Self(Rc::new(callback))
    }

    fn same_as(&self, other: &RouteHandler) -> bool {
        Rc::as_ptr(&self.0).cast::<u8>() == Rc::as_ptr(&other.0).cast::<u8>()
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RouteHandler")
            .field(&Rc::as_ptr(&self.0).cast::<u8>())
            .finish()
    }
}

/// One `get` receiver
#[derive(Clone)]
struct Binding {
    id: SubscriptionId,
    handler: RouteHandler,
    /// `None` for route-independent observers
    patterns: Option<Vec<String>>,
}

/// Why a click was left to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickRejection {
    NoAnchor,
    MissingHref,
    InvalidUrl(NavigationError),
    /// No registered pattern on this domain, and no proxy
    NotRoutable,
    Fragment,
    Ignored,
    MetaKey,
    BlankTarget,
    File,
}

impl fmt::Display for ClickRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClickRejection::NoAnchor => write!(f, "no anchor around click target"),
            ClickRejection::MissingHref => write!(f, "anchor has no href"),
            ClickRejection::InvalidUrl(error) => write!(f, "{}", error),
            ClickRejection::NotRoutable => write!(f, "no matching route on this domain"),
            ClickRejection::Fragment => write!(f, "link carries a fragment"),
            ClickRejection::Ignored => write!(f, "anchor carries the ignore class"),
            ClickRejection::MetaKey => write!(f, "meta key held"),
            ClickRejection::BlankTarget => write!(f, "anchor opens a new context"),
            ClickRejection::File => write!(f, "link points at a file"),
        }
    }
}

/// What to do after a navigation has been dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Nothing,
    MarkReady,
}

// ============================================================================
// Router
// ============================================================================

struct RouterInner {
    platform: Rc<dyn NavigationPlatform>,
    options: RouterOptions,
    history: HistoryCoordinator,
    matcher: RefCell<RouteMatcher>,
    cache: RefCell<ResponseCache>,
    bindings: RefCell<Vec<Binding>>,
    listeners: RefCell<EventRegistry<RouterEventKind, RouteCallback>>,
    uid: Cell<u64>,
    routing: Cell<bool>,
    ready: Cell<bool>,
    bound: Cell<bool>,
    active: RefCell<Option<Rc<Element>>>,
    dispatch_depth: Cell<usize>,
    deferred: RefCell<VecDeque<String>>,
    last_outcome: RefCell<Option<NavigationOutcome>>,
}

/// Click-driven PJAX router
///
/// Cloning yields another handle to the same router.
#[derive(Clone)]
pub struct NavigationRouter {
    inner: Rc<RouterInner>,
}

impl fmt::Debug for NavigationRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationRouter")
            .field("options", &self.inner.options)
            .field("routes", &self.inner.matcher.borrow().list_routes())
            .field("ready", &self.inner.ready.get())
            .field("routing", &self.inner.routing.get())
            .field("cached", &self.inner.cache.borrow().len())
            .finish()
    }
}

impl NavigationRouter {
    /// Create a router and its history coordinator
    ///
    /// Nothing is intercepted until [`NavigationRouter::bind`] is called.
    pub fn new(platform: Rc<dyn NavigationPlatform>, options: RouterOptions) -> Self {
        let history = HistoryCoordinator::new(Rc::clone(&platform), options.history.clone());
        let cache = ResponseCache::new(options.caching);

        Self {
            inner: Rc::new(RouterInner {
                platform,
                options,
                history,
                matcher: RefCell::new(RouteMatcher::new()),
                cache: RefCell::new(cache),
                bindings: RefCell::new(Vec::new()),
                listeners: RefCell::new(EventRegistry::new()),
                uid: Cell::new(0),
                routing: Cell::new(false),
                ready: Cell::new(false),
                bound: Cell::new(false),
                active: RefCell::new(None),
                dispatch_depth: Cell::new(0),
                deferred: RefCell::new(VecDeque::new()),
                last_outcome: RefCell::new(None),
            }),
        }
    }

    /// Start intercepting clicks and history, then evaluate the landing URL
    ///
    /// With `asynchronous` and `handle_404` set, the landing URL goes through
    /// the full fetch pipeline. Otherwise the current document stands in for
    /// the response after the settle delay. Either way the router becomes
    /// ready once the landing URL has been dispatched.
    pub fn bind(&self) {
        if self.inner.bound.replace(true) {
            trace_log!("router already bound");
            return;
        }

        let weak = Rc::downgrade(&self.inner);
        self.inner.platform.on_click(Rc::new(move |event: &mut ClickEvent| {
            with_router(&weak, |router| {
                router.handle_click(event);
            })
        }));

        let weak = Rc::downgrade(&self.inner);
        self.inner.history.on(HistoryEventKind::PopState, move |event| {
            if let HistoryEvent::PopState { url, .. } = event {
                with_router(&weak, |router| router.handle_popstate(url));
            }
        });

        let url = strip_fragment(&self.inner.platform.location());
        let options = &self.inner.options;

        if options.asynchronous && options.handle_404 {
            debug_log!("evaluating landing url {} through the pipeline", url);
            self.route(url, Completion::MarkReady);
        } else {
            debug_log!("evaluating landing url {} from the loaded document", url);
            let delay = self.inner.platform.delay(options.settle_delay);
            let weak = Rc::downgrade(&self.inner);
            self.inner.platform.spawn_local(Box::pin(async move {
                delay.await;
                with_router(&weak, |router| router.settle_landing(&url));
            }));
        }
    }

    /// Bind `handler` to `pattern`
    ///
    /// Binding an already bound handler adds the pattern to it and returns
    /// its existing subscription id.
    pub fn get(&self, pattern: impl Into<String>, handler: &RouteHandler) -> SubscriptionId {
        let pattern = pattern.into();
        self.inner.matcher.borrow_mut().configure([pattern.clone()]);

        let mut bindings = self.inner.bindings.borrow_mut();
        let existing = bindings
            .iter_mut()
            .find(|b| b.patterns.is_some() && b.handler.same_as(handler));

        if let Some(binding) = existing {
            if let Some(patterns) = binding.patterns.as_mut() {
                if !patterns.contains(&pattern) {
                    patterns.push(pattern);
                }
            }
            return binding.id;
        }

        let id = SubscriptionId::new(self.uid());
        trace_log!("binding handler {} to '{}'", id, pattern);
        bindings.push(Binding {
            id,
            handler: handler.clone(),
            patterns: Some(vec![pattern]),
        });
        id
    }

    /// Subscribe to a router event
    ///
    /// `Get` subscribers observe every `get` dispatch regardless of route.
    pub fn on<F>(&self, kind: RouterEventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&RouteEvent) + 'static,
    {
        let id = SubscriptionId::new(self.uid());

        match kind {
            RouterEventKind::Get => self.inner.bindings.borrow_mut().push(Binding {
                id,
                handler: RouteHandler::new(callback),
                patterns: None,
            }),
            _ => self
                .inner
                .listeners
                .borrow_mut()
                .subscribe(kind, id, Rc::new(callback)),
        }

        id
    }

    /// Remove a subscription or route binding; returns whether it existed
    pub fn off(&self, kind: RouterEventKind, id: SubscriptionId) -> bool {
        match kind {
            RouterEventKind::Get => {
                let mut bindings = self.inner.bindings.borrow_mut();
                let before = bindings.len();
                bindings.retain(|b| b.id != id);
                bindings.len() != before
            }
            _ => self.inner.listeners.borrow_mut().unsubscribe(kind, id),
        }
    }

    /// Navigate to `url` as if a link to it had been clicked
    ///
    /// Returns whether the router took the navigation.
    pub fn trigger(&self, url: &str) -> bool {
        let href = match self.inner.platform.location().join(url) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => url.to_string(),
        };

        let mut event = ClickEvent::new(Rc::new(Element::anchor(href)));
        self.handle_click(&mut event);
        event.default_prevented()
    }

    /// The anchor of the last accepted click
    pub fn active_element(&self) -> Option<Rc<Element>> {
        self.inner.active.borrow().clone()
    }

    /// Cleaned route string for `url`
    pub fn route_for_url(&self, url: &str) -> String {
        RouteMatcher::clean_route(url)
    }

    /// Parameters captured for `url` by the best registered pattern
    pub fn route_data_for_url(&self, url: &str) -> RouteParams {
        let mut matcher = self.inner.matcher.borrow_mut();
        let routes = matcher.list_routes().to_vec();
        matcher.parse(url, &routes).params
    }

    /// Next unique id; starts at 1 and never resets
    pub fn uid(&self) -> u64 {
        let next = self.inner.uid.get() + 1;
        self.inner.uid.set(next);
        next
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.get()
    }

    /// Whether a click-initiated navigation is unresolved
    pub fn is_routing(&self) -> bool {
        self.inner.routing.get()
    }

    pub fn history(&self) -> &HistoryCoordinator {
        &self.inner.history
    }

    pub fn options(&self) -> &RouterOptions {
        &self.inner.options
    }

    pub fn cached_response(&self, url: &str) -> Option<HttpResponse> {
        self.inner.cache.borrow().get(url).cloned()
    }

    /// How the most recently resolved navigation ended
    pub fn last_outcome(&self) -> Option<NavigationOutcome> {
        self.inner.last_outcome.borrow().clone()
    }

    /// Registered patterns in registration order
    pub fn routes(&self) -> Vec<String> {
        self.inner.matcher.borrow().list_routes().to_vec()
    }

    // ------------------------------------------------------------------
    // Click interception
    // ------------------------------------------------------------------

    fn handle_click(&self, event: &mut ClickEvent) {
        let anchor = match self.check_click(event) {
            Ok(anchor) => anchor,
            Err(rejection) => {
                trace_log!("click left alone: {}", rejection);
                return;
            }
        };

        event.prevent_default();
        let href = anchor.href_attr().unwrap_or_default().to_string();
        *self.inner.active.borrow_mut() = Some(anchor);

        self.request_navigation(href);
    }

    fn check_click(&self, event: &ClickEvent) -> Result<Rc<Element>, ClickRejection> {
        let anchor =
            ElementMatcher::resolve(&event.target, "a", true).ok_or(ClickRejection::NoAnchor)?;
        let href = anchor.href_attr().ok_or(ClickRejection::MissingHref)?;

        let location = self.inner.platform.location();
        let url = location.join(href).map_err(|err| {
            ClickRejection::InvalidUrl(NavigationError::InvalidUrl {
                url: href.to_string(),
                message: err.to_string(),
            })
        })?;

        let same_domain = url.host_str() == location.host_str();
        let matched = self.inner.matcher.borrow_mut().test(url.as_str());
        if !(matched && same_domain) && self.inner.options.proxy.is_none() {
            return Err(ClickRejection::NotRoutable);
        }

        if href.contains('#') {
            return Err(ClickRejection::Fragment);
        }
        if anchor.has_class(&self.inner.options.ignore_class) {
            return Err(ClickRejection::Ignored);
        }
        if event.meta_key {
            return Err(ClickRejection::MetaKey);
        }
        if anchor.target_attr() == Some("_blank") {
            return Err(ClickRejection::BlankTarget);
        }
        if same_domain && is_file(&url) {
            return Err(ClickRejection::File);
        }

        Ok(anchor)
    }

    fn request_navigation(&self, href: String) {
        let url = match self.inner.platform.location().join(&href) {
            Ok(url) => url.to_string(),
            Err(_) => href,
        };

        if self.inner.dispatch_depth.get() > 0 {
            trace_log!("deferring navigation to {} until dispatch returns", url);
            self.inner.deferred.borrow_mut().push_back(url);
            return;
        }

        if self.inner.routing.get() {
            debug_log!("already routing, ignoring {}", url);
            return;
        }

        self.route(url, Completion::Nothing);
    }

    // ------------------------------------------------------------------
    // Routing pipeline
    // ------------------------------------------------------------------

    fn route(&self, url: String, completion: Completion) {
        self.inner.routing.set(true);
        self.announce(&url);

        let cached = self.cached_response(&url);
        if let Some(response) = cached {
            trace_log!("serving {} from cache", url);
            self.settle(&url, Ok(response), completion);
            return;
        }

        if !self.inner.options.asynchronous {
            self.settle(&url, Ok(HttpResponse::synthetic()), completion);
            return;
        }

        let request_url = self.request_url(&url);
        debug_log!("fetching {} for {}", request_url, url);

        let fetch = self.inner.platform.fetch(&request_url);
        let weak = Rc::downgrade(&self.inner);
        self.inner.platform.spawn_local(Box::pin(async move {
            let result = fetch.await;
            with_router(&weak, |router| router.settle(&url, result, completion));
        }));
    }

    /// Where the GET for `url` is sent
    fn request_url(&self, url: &str) -> String {
        let Some(proxy) = &self.inner.options.proxy else {
            return url.to_string();
        };

        match Url::parse(url) {
            Ok(parsed) => {
                let path_and_query = match parsed.query() {
                    Some(query) => format!("{}?{}", parsed.path(), query),
                    None => parsed.path().to_string(),
                };
                proxy.request_url(&path_and_query)
            }
            Err(_) => proxy.request_url(url),
        }
    }

    /// Fire `preget` for the first matching binding, once ready
    fn announce(&self, url: &str) {
        if !self.inner.ready.get() {
            return;
        }

        if let Some(request) = self.best_request(url) {
            let event = RouteEvent {
                route: RouteMatcher::clean_route(url),
                url: url.to_string(),
                response: None,
                request,
                status: None,
            };
            self.fire(RouterEventKind::PreGet, &event);
        }
    }

    fn settle(
        &self,
        url: &str,
        result: Result<HttpResponse, NavigationError>,
        completion: Completion,
    ) {
        self.deferring(|| self.resolve(url, result, completion));
    }

    fn resolve(
        &self,
        url: &str,
        result: Result<HttpResponse, NavigationError>,
        completion: Completion,
    ) {
        let outcome = match result {
            Err(error) => {
                warn_log!("navigation to {} failed: {}", url, error);
                self.inner.routing.set(false);
                NavigationOutcome::Failed(error)
            }
            Ok(response) if !self.inner.options.status_policy().accepts(response.status) => {
                let error = NavigationError::UnhandledStatus {
                    url: url.to_string(),
                    status: response.status,
                };
                warn_log!("dropping response: {}", error);
                self.inner.routing.set(false);
                NavigationOutcome::Dropped {
                    url: url.to_string(),
                    status: response.status,
                }
            }
            Ok(response) => {
                self.inner.cache.borrow_mut().store(url, &response);
                self.inner.routing.set(false);
                self.inner.history.push(url);

                let status = response.status;
                self.dispatch_get(url, response);
                self.complete(completion);

                NavigationOutcome::Handled {
                    url: url.to_string(),
                    status,
                }
            }
        };

        debug_log!("navigation resolved: {:?}", outcome);
        *self.inner.last_outcome.borrow_mut() = Some(outcome);
    }

    fn settle_landing(&self, url: &str) {
        let response = HttpResponse::ok(self.inner.platform.serialize_document());
        self.inner.cache.borrow_mut().store(url, &response);

        self.deferring(|| {
            self.dispatch_get(url, response);
            self.complete(Completion::MarkReady);
        });

        *self.inner.last_outcome.borrow_mut() = Some(NavigationOutcome::Handled {
            url: url.to_string(),
            status: 200,
        });
    }

    fn complete(&self, completion: Completion) {
        if completion == Completion::MarkReady {
            debug_log!("router ready");
            self.inner.ready.set(true);
        }
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    fn handle_popstate(&self, url: &str) {
        if !self.inner.ready.get() {
            // Engines may emit a popstate while the landing page loads
            trace_log!("popstate before ready, marking ready");
            self.inner.ready.set(true);
            return;
        }

        let cached = self.cached_response(url);
        let event = RouteEvent {
            route: RouteMatcher::clean_route(url),
            url: url.to_string(),
            status: cached.as_ref().map(|r| r.status),
            response: cached,
            request: self
                .best_request(url)
                .unwrap_or_else(|| RouteRequest::unmatched(url)),
        };

        debug_log!("history moved to {}", url);
        self.fire(RouterEventKind::PopGet, &event);
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Parse result of the most recently bound handler matching `url`
    fn best_request(&self, url: &str) -> Option<RouteRequest> {
        let bindings = self.inner.bindings.borrow().clone();
        let mut matcher = self.inner.matcher.borrow_mut();

        bindings.iter().rev().find_map(|binding| {
            let patterns = binding.patterns.as_ref()?;
            let request = matcher.parse(url, patterns);
            request.matched.then_some(request)
        })
    }

    fn dispatch_get(&self, url: &str, response: HttpResponse) {
        let bindings = self.inner.bindings.borrow().clone();
        let route = RouteMatcher::clean_route(url);

        self.deferring(|| {
            for binding in bindings.iter().rev() {
                let request = {
                    let mut matcher = self.inner.matcher.borrow_mut();
                    match &binding.patterns {
                        Some(patterns) => matcher.parse(url, patterns),
                        None => {
                            let routes = matcher.list_routes().to_vec();
                            matcher.parse(url, &routes)
                        }
                    }
                };

                if binding.patterns.is_some() && !request.matched {
                    continue;
                }

                let event = RouteEvent {
                    route: route.clone(),
                    url: url.to_string(),
                    response: Some(response.clone()),
                    request,
                    status: Some(response.status),
                };
                invoke_contained("get", || (binding.handler.0)(&event));
            }
        });
    }

    fn fire(&self, kind: RouterEventKind, event: &RouteEvent) {
        let subscribers = self.inner.listeners.borrow().snapshot(kind);
        trace_log!("firing {} to {} subscriber(s)", kind, subscribers.len());

        self.deferring(|| {
            for subscriber in subscribers {
                invoke_contained(&kind.to_string(), || subscriber(event));
            }
        });
    }

    /// Run `f` with navigation requests held until the outermost scope returns
    fn deferring(&self, f: impl FnOnce()) {
        let depth = &self.inner.dispatch_depth;
        depth.set(depth.get() + 1);
        f();
        depth.set(depth.get() - 1);

        if depth.get() == 0 {
            self.drain_deferred();
        }
    }

    fn drain_deferred(&self) {
        loop {
            let next = self.inner.deferred.borrow_mut().pop_front();
            let Some(url) = next else {
                break;
            };

            if self.inner.routing.get() {
                debug_log!("already routing, ignoring deferred {}", url);
                continue;
            }
            self.route(url, Completion::Nothing);
        }
    }
}

fn with_router(weak: &Weak<RouterInner>, f: impl FnOnce(&NavigationRouter)) {
    if let Some(inner) = weak.upgrade() {
        f(&NavigationRouter { inner });
    }
}

fn is_file(url: &Url) -> bool {
    let last = url.path().rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((_, extension)) => FILE_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(extension)),
        None => false,
    }
}
