//! Integration tests for pjax_navigator
//!
//! These tests drive a router end to end through `MemoryPlatform`: clicks,
//! fetches, cache hits, history traversal and the hash fallback.

use pjax_navigator::*;
use std::cell::RefCell;
use std::rc::Rc;

// ============================================================================
// Harness
// ============================================================================

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Harness {
    platform: Rc<MemoryPlatform>,
    router: NavigationRouter,
}

impl Harness {
    /// A router at `url` whose landing page answers "home"
    fn new(url: &str, options: RouterOptions) -> Self {
        init_logging();
        let platform = Rc::new(MemoryPlatform::new(url).unwrap());
        platform.respond(url, HttpResponse::ok("home"));
        let router = NavigationRouter::new(platform.clone(), options);
        Self { platform, router }
    }

    fn bind(&self) {
        self.router.bind();
        self.platform.run_until_idle();
        assert!(self.router.is_ready());
    }

    fn click(&self, href: &str) -> bool {
        let event = self.platform.click(Rc::new(Element::anchor(href)));
        self.platform.run_until_idle();
        event.default_prevented()
    }
}

type Log = Rc<RefCell<Vec<RouteEvent>>>;

fn handler(log: &Log) -> RouteHandler {
    let log = Rc::clone(log);
    RouteHandler::new(move |event| log.borrow_mut().push(event.clone()))
}

fn subscribe(router: &NavigationRouter, kind: RouterEventKind) -> Log {
    let log: Log = Rc::default();
    let sink = Rc::clone(&log);
    router.on(kind, move |event| sink.borrow_mut().push(event.clone()));
    log
}

fn labelled(labels: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> RouteHandler {
    let labels = Rc::clone(labels);
    RouteHandler::new(move |_| labels.borrow_mut().push(label))
}

// ============================================================================
// Click-driven navigation
// ============================================================================

#[test]
fn test_measurement_flow() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform
        .respond("http://x/measurement", HttpResponse::ok("<main>measurement</main>"));

    let gets: Log = Rc::default();
    h.router.get("/measurement", &handler(&gets));
    let pregets = subscribe(&h.router, RouterEventKind::PreGet);
    h.bind();

    assert!(h.click("/measurement"));

    let gets = gets.borrow();
    assert_eq!(gets.len(), 1);
    let event = &gets[0];
    assert_eq!(event.route, "/measurement");
    assert_eq!(event.url, "http://x/measurement");
    assert_eq!(event.status, Some(200));
    assert_eq!(
        event.response.as_ref().map(|r| r.body.as_str()),
        Some("<main>measurement</main>")
    );
    assert!(event.request.matched);
    assert_eq!(event.request.route, "/measurement");

    assert_eq!(pregets.borrow().len(), 1);
    assert_eq!(pregets.borrow()[0].response, None);

    assert_eq!(h.platform.current_url(), "http://x/measurement");
    assert!(h.router.history().state_for("http://x/measurement").is_some());
    assert!(h.router.cached_response("http://x/measurement").is_some());
    assert!(!h.router.is_routing());
    assert!(h.router.last_outcome().unwrap().is_handled());
}

#[test]
fn test_cached_second_click_makes_no_request() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform.respond("http://x/a", HttpResponse::ok("A"));
    let gets: Log = Rc::default();
    let pages = handler(&gets);
    h.router.get("/", &pages);
    h.router.get("/a", &pages);
    h.bind();

    assert!(h.click("/a"));
    assert!(h.click("/"));
    assert!(h.click("/a"));

    assert_eq!(h.platform.fetch_log(), vec!["http://x/", "http://x/a"]);
    let routes: Vec<String> = gets.borrow().iter().map(|e| e.route.clone()).collect();
    assert_eq!(routes, vec!["/", "/a", "/", "/a"]);
    assert_eq!(gets.borrow()[3].response, Some(HttpResponse::ok("A")));
}

#[test]
fn test_cache_keeps_first_response() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform.respond("http://x/a", HttpResponse::ok("first"));
    h.router.get("/", &RouteHandler::new(|_| {}));
    h.router.get("/a", &RouteHandler::new(|_| {}));
    h.bind();

    h.click("/a");
    h.platform.respond("http://x/a", HttpResponse::ok("second"));
    h.click("/");
    h.click("/a");

    assert_eq!(h.router.cached_response("http://x/a").unwrap().body, "first");
}

#[test]
fn test_caching_disabled_refetches() {
    let h = Harness::new("http://x/", RouterOptions::new().caching(false));
    h.platform.respond("http://x/a", HttpResponse::ok("A"));
    h.router.get("/", &RouteHandler::new(|_| {}));
    h.router.get("/a", &RouteHandler::new(|_| {}));
    h.bind();

    h.click("/a");
    h.click("/");
    h.click("/a");

    assert_eq!(
        h.platform.fetch_log(),
        vec!["http://x/", "http://x/a", "http://x/", "http://x/a"]
    );
    assert!(h.router.cached_response("http://x/a").is_none());
}

#[test]
fn test_click_on_current_page_adds_no_history_entry() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.router.get("/", &RouteHandler::new(|_| {}));
    h.bind();

    assert!(h.click("/"));
    assert_eq!(h.platform.history_len(), 1);
    assert_eq!(h.router.history().states(), 1);
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_union_dispatch_in_reverse_registration_order() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform.respond("http://x/items/5", HttpResponse::ok("item"));

    let labels = Rc::new(RefCell::new(Vec::new()));
    h.router.get("/items/:id", &labelled(&labels, "detail"));
    h.router.get("/items/*", &labelled(&labels, "section"));
    h.router.get("/other", &labelled(&labels, "other"));
    let sink = Rc::clone(&labels);
    h.router
        .on(RouterEventKind::Get, move |_| sink.borrow_mut().push("observer"));
    h.bind();
    labels.borrow_mut().clear();

    assert!(h.click("/items/5"));
    assert_eq!(*labels.borrow(), vec!["observer", "section", "detail"]);
}

#[test]
fn test_handler_bound_to_several_patterns_fires_once() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform.respond("http://x/items/5", HttpResponse::ok("item"));

    let gets: Log = Rc::default();
    let pages = handler(&gets);
    h.router.get("/items/:id", &pages);
    h.router.get("/items/*", &pages);
    h.bind();

    h.click("/items/5");
    let gets = gets.borrow();
    assert_eq!(gets.len(), 1);
    // Static/param patterns outrank the wildcard
    assert_eq!(gets[0].request.route, "/items/:id");
    assert_eq!(gets[0].request.params.get("id"), Some(&"5".to_string()));
}

#[test]
fn test_preget_fires_once_for_most_recent_match() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform.respond("http://x/p/1", HttpResponse::ok("P"));
    h.router.get("/p/:id", &RouteHandler::new(|_| {}));
    h.router.get("/p/*", &RouteHandler::new(|_| {}));
    let pregets = subscribe(&h.router, RouterEventKind::PreGet);

    h.bind();
    // Not ready during the landing navigation
    assert!(pregets.borrow().is_empty());

    h.click("/p/1");
    let pregets = pregets.borrow();
    assert_eq!(pregets.len(), 1);
    assert_eq!(pregets[0].request.route, "/p/*");
    assert_eq!(pregets[0].route, "/p/1");
}

#[test]
fn test_query_string_reaches_handlers() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform
        .respond("http://x/search?q=rust&page=2", HttpResponse::ok("results"));
    let gets: Log = Rc::default();
    h.router.get("/search", &handler(&gets));
    h.bind();

    h.click("/search?q=rust&page=2");

    let gets = gets.borrow();
    assert_eq!(gets[0].route, "/search");
    assert_eq!(gets[0].request.query.get("q"), Some(&"rust".to_string()));
    assert_eq!(gets[0].request.query.get_as::<u32>("page"), Some(2));
}

#[test]
fn test_trigger_runs_click_logic() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform.respond("http://x/a", HttpResponse::ok("A"));
    let gets: Log = Rc::default();
    h.router.get("/a", &handler(&gets));
    h.bind();

    assert!(!h.router.trigger("/a#section"));
    assert!(!h.router.trigger("/unrouted"));
    assert!(h.router.trigger("/a"));
    h.platform.run_until_idle();

    assert_eq!(gets.borrow().len(), 1);
    assert_eq!(
        h.router.active_element().and_then(|a| a.href_attr().map(str::to_string)),
        Some("http://x/a".to_string())
    );
}

#[test]
fn test_navigation_requested_during_dispatch_is_deferred() {
    let h = Harness::new("http://x/", RouterOptions::new().asynchronous(false));
    let order = Rc::new(RefCell::new(Vec::new()));

    let router = h.router.clone();
    let log = Rc::clone(&order);
    h.router.get(
        "/a",
        &RouteHandler::new(move |_| {
            log.borrow_mut().push("a:start");
            assert!(router.trigger("/b"));
            log.borrow_mut().push("a:end");
        }),
    );
    h.router.get("/b", &labelled(&order, "b"));
    h.bind();

    assert!(h.click("/a"));
    assert_eq!(*order.borrow(), vec!["a:start", "a:end", "b"]);
    assert_eq!(h.platform.current_url(), "http://x/b");
}

// ============================================================================
// Eligibility
// ============================================================================

#[test]
fn test_domain_gating() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.router.get("/a", &RouteHandler::new(|_| {}));
    h.bind();

    assert!(!h.click("http://elsewhere.com/a"));
    assert_eq!(h.platform.fetch_count(), 1);

    h.platform.respond("http://x/a", HttpResponse::ok("A"));
    assert!(h.click("http://x/a"));
}

#[test]
fn test_extension_gating() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.router.get("/files/*", &RouteHandler::new(|_| {}));
    h.bind();

    for file in ["/files/report.pdf", "/files/photo.JPG", "/files/song.mp3"] {
        assert!(!h.click(file), "{} should be left alone", file);
    }
    h.platform.respond("http://x/files/index", HttpResponse::ok("listing"));
    assert!(h.click("/files/index"));
}

#[test]
fn test_opt_outs() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.router.get("/a", &RouteHandler::new(|_| {}));
    h.bind();

    let ignored = Element::anchor("/a").class_name("js-router--ignore");
    assert!(!h.platform.click(Rc::new(ignored)).default_prevented());

    let blank = Element::anchor("/a").target("_blank");
    assert!(!h.platform.click(Rc::new(blank)).default_prevented());

    let meta = ClickEvent::new(Rc::new(Element::anchor("/a"))).with_meta_key(true);
    assert!(!h.platform.dispatch_click(meta).default_prevented());

    assert_eq!(h.platform.fetch_count(), 1);
}

// ============================================================================
// Proxy
// ============================================================================

#[test]
fn test_proxy_rewrites_request_only() {
    let h = Harness::new("http://x/", RouterOptions::new().proxy("https://api.example.com/"));
    h.platform
        .respond("https://api.example.com/", HttpResponse::ok("proxied home"));
    h.platform
        .respond("https://api.example.com/a?x=1", HttpResponse::ok("proxied A"));
    let gets: Log = Rc::default();
    h.router.get("/a", &handler(&gets));
    h.bind();

    assert!(h.click("/a?x=1"));

    assert_eq!(
        h.platform.fetch_log(),
        vec!["https://api.example.com/", "https://api.example.com/a?x=1"]
    );
    assert_eq!(h.platform.current_url(), "http://x/a?x=1");
    assert_eq!(gets.borrow()[0].url, "http://x/a?x=1");
    assert_eq!(
        h.router.cached_response("http://x/a?x=1").unwrap().body,
        "proxied A"
    );
}

#[test]
fn test_proxy_takes_foreign_and_unrouted_links() {
    let h = Harness::new("http://x/", RouterOptions::new().proxy("https://api.example.com"));
    h.platform
        .respond("https://api.example.com/", HttpResponse::ok("proxied home"));
    h.bind();

    // Foreign-domain files are not subject to the extension check
    assert!(h.click("http://cdn.example.com/doc.pdf"));
    assert_eq!(
        h.platform.fetch_log().last().map(String::as_str),
        Some("https://api.example.com/doc.pdf")
    );
}

// ============================================================================
// Status policy
// ============================================================================

#[test]
fn test_404_and_500_are_dispatched_by_default() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform.respond("http://x/boom", HttpResponse::new(500, "error"));
    let gets: Log = Rc::default();
    let pages = handler(&gets);
    h.router.get("/missing", &pages);
    h.router.get("/boom", &pages);
    h.bind();

    h.click("/missing");
    h.click("/boom");

    let statuses: Vec<Option<u16>> = gets.borrow().iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![Some(404), Some(500)]);
    assert_eq!(h.router.cached_response("http://x/missing").unwrap().status, 404);
}

#[test]
fn test_unhandled_status_is_dropped() {
    let h = Harness::new("http://x/", RouterOptions::new().handle_500(false));
    h.platform.respond("http://x/boom", HttpResponse::new(500, "error"));
    h.platform.respond("http://x/moved", HttpResponse::new(302, ""));
    h.platform.respond("http://x/a", HttpResponse::ok("A"));
    let gets: Log = Rc::default();
    let pages = handler(&gets);
    h.router.get("/boom", &pages);
    h.router.get("/moved", &pages);
    h.router.get("/a", &pages);
    h.bind();

    assert!(h.click("/boom"));
    let outcome = h.router.last_outcome().unwrap();
    assert!(outcome.is_dropped());
    assert_eq!(outcome.status(), Some(500));

    assert!(h.click("/moved"));
    assert!(h.router.last_outcome().unwrap().is_dropped());

    assert!(gets.borrow().is_empty());
    assert!(h.router.cached_response("http://x/boom").is_none());
    assert_eq!(h.platform.current_url(), "http://x/");

    // The routing flag was released, so the next click still routes
    assert!(!h.router.is_routing());
    h.click("/a");
    assert_eq!(gets.borrow().len(), 1);
}

#[test]
fn test_without_404_handling_landing_uses_document() {
    init_logging();
    let platform = Rc::new(
        MemoryPlatform::new("http://x/")
            .unwrap()
            .with_document("<html><body>landing</body></html>"),
    );
    let router = NavigationRouter::new(platform.clone(), RouterOptions::new().handle_404(false));
    let gets: Log = Rc::default();
    router.get("/", &handler(&gets));
    router.get("/missing", &handler(&gets));

    router.bind();
    assert!(!router.is_ready());
    platform.run_until_idle();

    assert!(router.is_ready());
    assert_eq!(platform.fetch_count(), 0);
    assert_eq!(
        gets.borrow()[0].response.as_ref().map(|r| r.body.as_str()),
        Some("<html><body>landing</body></html>")
    );

    // 404s are now dropped
    let event = platform.click(Rc::new(Element::anchor("/missing")));
    assert!(event.default_prevented());
    platform.run_until_idle();
    assert_eq!(gets.borrow().len(), 1);
}

// ============================================================================
// History
// ============================================================================

#[test]
fn test_back_navigation_fires_popget_from_cache() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform.respond("http://x/a", HttpResponse::ok("A"));
    let pages: Log = Rc::default();
    let page = handler(&pages);
    h.router.get("/", &page);
    h.router.get("/a", &page);
    let popgets = subscribe(&h.router, RouterEventKind::PopGet);
    h.bind();
    h.click("/a");

    h.router.history().go_back();
    h.platform.run_until_idle();

    {
        let popgets = popgets.borrow();
        assert_eq!(popgets.len(), 1);
        let event = &popgets[0];
        assert_eq!(event.url, "http://x/");
        assert_eq!(event.route, "/");
        assert_eq!(event.status, Some(200));
        assert_eq!(event.response, Some(HttpResponse::ok("home")));
        assert!(event.request.matched);
    }

    h.router.history().go_forward();
    h.platform.run_until_idle();

    let popgets = popgets.borrow();
    assert_eq!(popgets.len(), 2);
    assert_eq!(popgets[1].response, Some(HttpResponse::ok("A")));
    assert_eq!(h.platform.fetch_count(), 2);
}

#[test]
fn test_popget_for_uncached_url() {
    let h = Harness::new("http://x/", RouterOptions::default());
    let popgets = subscribe(&h.router, RouterEventKind::PopGet);
    h.bind();

    // An entry the router never fetched
    h.platform.navigate_hash("elsewhere");
    h.platform.run_until_idle();
    assert!(popgets.borrow().is_empty());

    h.platform.history_back();
    h.platform.run_until_idle();
    h.platform.history_forward();
    h.platform.run_until_idle();

    let popgets = popgets.borrow();
    assert_eq!(popgets.len(), 2);
    assert_eq!(popgets[0].status, Some(200));
    assert_eq!(popgets[1].url, "http://x/#elsewhere");
    assert_eq!(popgets[1].response, None);
    assert_eq!(popgets[1].status, None);
    assert!(!popgets[1].request.matched);
}

#[test]
fn test_popstate_interleaves_with_in_flight_fetch() {
    let h = Harness::new("http://x/", RouterOptions::default());
    h.platform.respond("http://x/a", HttpResponse::ok("A"));
    h.platform.respond("http://x/b", HttpResponse::ok("B"));
    let gets: Log = Rc::default();
    let page = handler(&gets);
    h.router.get("/", &page);
    h.router.get("/a", &page);
    h.router.get("/b", &page);
    let popgets = subscribe(&h.router, RouterEventKind::PopGet);
    h.bind();
    h.click("/a");
    gets.borrow_mut().clear();

    // Back is queued ahead of the fetch for /b
    h.router.history().go_back();
    assert!(h.router.trigger("/b"));
    assert!(h.router.is_routing());

    // The popstate is delivered while /b is still in flight
    assert!(h.platform.run_next());
    assert_eq!(popgets.borrow().len(), 1);
    assert_eq!(popgets.borrow()[0].url, "http://x/");
    assert_eq!(popgets.borrow()[0].response, Some(HttpResponse::ok("home")));
    assert!(h.router.is_routing());
    assert!(gets.borrow().is_empty());
    assert!(h.router.cached_response("http://x/b").is_none());

    // The superseded fetch still completes: cache, get and push
    h.platform.run_until_idle();
    assert!(!h.router.is_routing());
    assert_eq!(h.router.cached_response("http://x/b"), Some(HttpResponse::ok("B")));
    let urls: Vec<String> = gets.borrow().iter().map(|e| e.url.clone()).collect();
    assert_eq!(urls, vec!["http://x/b"]);
    assert_eq!(h.platform.current_url(), "http://x/b");
    assert!(h.router.history().state_for("http://x/b").is_some());
    assert_eq!(popgets.borrow().len(), 1);
}

#[test]
fn test_spurious_popstate_before_ready_only_marks_ready() {
    init_logging();
    let platform = Rc::new(MemoryPlatform::new("http://x/").unwrap());
    platform.respond("http://x/", HttpResponse::ok("home"));
    let router = NavigationRouter::new(platform.clone(), RouterOptions::default());
    let popgets = subscribe(&router, RouterEventKind::PopGet);

    platform.emit_popstate();
    router.bind();

    assert!(platform.run_next());
    assert!(router.is_ready());
    assert!(router.is_routing());
    assert!(popgets.borrow().is_empty());

    platform.run_until_idle();
    assert!(!router.is_routing());
    assert!(popgets.borrow().is_empty());
}

#[test]
fn test_hash_fallback_end_to_end() {
    let h = Harness::new("http://x/foo/", RouterOptions::new().force_hash(true));
    h.platform.respond("http://x/foo/bar/", HttpResponse::ok("bar"));
    let gets: Log = Rc::default();
    let page = handler(&gets);
    h.router.get("/foo/", &page);
    h.router.get("/foo/bar/", &page);
    let popgets = subscribe(&h.router, RouterEventKind::PopGet);
    h.bind();
    assert_eq!(h.router.history().mode(), HistoryMode::Hash);

    assert!(h.click("/foo/bar/"));
    assert_eq!(h.platform.current_url(), "http://x/foo/#/bar/");
    assert!(popgets.borrow().is_empty());

    // The user edits the fragment back to the root
    h.platform.navigate_hash("/");
    h.platform.run_until_idle();

    let popgets = popgets.borrow();
    assert_eq!(popgets.len(), 1);
    assert_eq!(popgets[0].url, "http://x/foo/");
    assert_eq!(popgets[0].response, Some(HttpResponse::ok("home")));
}

#[test]
fn test_inert_history_still_routes() {
    init_logging();
    let platform = Rc::new(
        MemoryPlatform::new("http://x/")
            .unwrap()
            .with_push_state(false)
            .with_hash_change(false),
    );
    platform.respond("http://x/", HttpResponse::ok("home"));
    platform.respond("http://x/a", HttpResponse::ok("A"));
    let router = NavigationRouter::new(platform.clone(), RouterOptions::default());
    let gets: Log = Rc::default();
    router.get("/a", &handler(&gets));
    router.bind();
    platform.run_until_idle();

    assert!(router.trigger("/a"));
    platform.run_until_idle();

    assert_eq!(router.history().mode(), HistoryMode::Inert);
    assert_eq!(gets.borrow().len(), 1);
    assert_eq!(platform.current_url(), "http://x/");
    assert_eq!(router.history().current_url(), "http://x/a");
}
