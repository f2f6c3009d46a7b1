//! Browser navigation platform
//!
//! [`BrowserPlatform`] drives the real `window` and `document` through
//! `web-sys`: `history.pushState`, `location.hash`, document-level click
//! capture, `fetch` and `setTimeout`.

use super::{ClickListener, FetchFuture, LocalTask, NavigationPlatform, PlatformListener};
use crate::dom::{ClickEvent, Element};
use crate::error::NavigationError;
use crate::history::NavigationState;
use crate::response::HttpResponse;
use crate::{trace_log, warn_log};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// [`NavigationPlatform`] backed by the page the module runs in
pub struct BrowserPlatform {
    window: web_sys::Window,
    document: web_sys::Document,
    last_location: RefCell<Url>,
}

impl BrowserPlatform {
    pub fn new() -> Result<Self, NavigationError> {
        let window = web_sys::window().ok_or_else(|| unavailable("window"))?;
        let document = window.document().ok_or_else(|| unavailable("document"))?;
        let href = window
            .location()
            .href()
            .map_err(|err| unavailable(&js_message(&err)))?;
        let location = Url::parse(&href)?;

        Ok(Self {
            window,
            document,
            last_location: RefCell::new(location),
        })
    }

    fn history(&self) -> Option<web_sys::History> {
        self.window.history().ok()
    }

    fn listen(
        &self,
        target: &web_sys::EventTarget,
        event: &str,
        capture: bool,
        f: Box<dyn FnMut(web_sys::Event)>,
    ) {
        let closure = Closure::wrap(f);
        if let Err(err) = target.add_event_listener_with_callback_and_bool(
            event,
            closure.as_ref().unchecked_ref(),
            capture,
        ) {
            warn_log!("could not listen for {}: {}", event, js_message(&err));
        }
        // Listeners live as long as the page
        closure.forget();
    }
}

impl NavigationPlatform for BrowserPlatform {
    fn location(&self) -> Url {
        let parsed = self
            .window
            .location()
            .href()
            .ok()
            .and_then(|href| Url::parse(&href).ok());

        match parsed {
            Some(url) => {
                *self.last_location.borrow_mut() = url.clone();
                url
            }
            None => self.last_location.borrow().clone(),
        }
    }

    fn supports_push_state(&self) -> bool {
        self.history().is_some()
    }

    fn supports_hash_change(&self) -> bool {
        js_sys::Reflect::has(&self.window, &JsValue::from_str("onhashchange")).unwrap_or(false)
    }

    fn push_state(&self, state: &NavigationState, title: &str, url: &str) {
        let Some(history) = self.history() else {
            return;
        };

        let payload = js_sys::Object::new();
        let fields = [
            ("uid", JsValue::from_f64(state.uid as f64)),
            ("url", JsValue::from_str(&state.url)),
        ];
        for (key, value) in fields {
            if let Err(err) = js_sys::Reflect::set(&payload, &JsValue::from_str(key), &value) {
                warn_log!("could not set state.{} for {}: {}", key, url, js_message(&err));
            }
        }

        if let Err(err) = history.push_state_with_url(&payload, title, Some(url)) {
            warn_log!("pushState to {} failed: {}", url, js_message(&err));
        }
    }

    fn history_back(&self) {
        if let Some(Err(err)) = self.history().map(|h| h.back()) {
            warn_log!("history.back failed: {}", js_message(&err));
        }
    }

    fn history_forward(&self) {
        if let Some(Err(err)) = self.history().map(|h| h.forward()) {
            warn_log!("history.forward failed: {}", js_message(&err));
        }
    }

    fn set_hash(&self, fragment: &str) {
        if let Err(err) = self.window.location().set_hash(fragment) {
            warn_log!("setting hash #{} failed: {}", fragment, js_message(&err));
        }
    }

    fn serialize_document(&self) -> String {
        web_sys::XmlSerializer::new()
            .and_then(|serializer| serializer.serialize_to_string(&self.document))
            .unwrap_or_default()
    }

    fn fetch(&self, url: &str) -> FetchFuture {
        let promise = self.window.fetch_with_str(url);
        let url = url.to_string();

        Box::pin(async move {
            let response = JsFuture::from(promise)
                .await
                .map_err(|err| NavigationError::transport(&url, js_message(&err)))?;
            let response: web_sys::Response = response
                .dyn_into()
                .map_err(|err| NavigationError::transport(&url, js_message(&err)))?;

            let status = response.status();
            let text = response
                .text()
                .map_err(|err| NavigationError::transport(&url, js_message(&err)))?;
            let body = JsFuture::from(text)
                .await
                .map_err(|err| NavigationError::transport(&url, js_message(&err)))?;

            Ok(HttpResponse::new(status, body.as_string().unwrap_or_default()))
        })
    }

    fn spawn_local(&self, task: LocalTask) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn delay(&self, duration: Duration) -> LocalTask {
        let window = self.window.clone();
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);

        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            if let Err(err) =
                window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
            {
                warn_log!("setTimeout failed: {}", js_message(&err));
            }
        });

        Box::pin(async move {
            let _ = JsFuture::from(promise).await;
        })
    }

    fn on_click(&self, listener: ClickListener) {
        self.listen(
            self.document.as_ref(),
            "click",
            true,
            Box::new(move |event: web_sys::Event| {
                let Some(anchor) = clicked_anchor(&event) else {
                    return;
                };
                let meta_key = event
                    .dyn_ref::<web_sys::MouseEvent>()
                    .is_some_and(|mouse| mouse.meta_key());

                let mut click = ClickEvent::new(Rc::new(anchor)).with_meta_key(meta_key);
                listener(&mut click);

                if click.default_prevented() {
                    event.prevent_default();
                }
            }),
        );
    }

    fn on_popstate(&self, listener: PlatformListener) {
        self.listen(self.window.as_ref(), "popstate", false, Box::new(move |_| listener()));
    }

    fn on_hashchange(&self, listener: PlatformListener) {
        self.listen(self.window.as_ref(), "hashchange", false, Box::new(move |_| listener()));
    }
}

/// Translate the nearest `<a>` around the event target
fn clicked_anchor(event: &web_sys::Event) -> Option<Element> {
    let target: web_sys::Element = event.target()?.dyn_into().ok()?;
    let node = target.closest("a").ok()??;
    let anchor: web_sys::HtmlAnchorElement = node.dyn_into().ok()?;

    let mut element = Element::new("a")
        .href(anchor.href())
        .class_name(&anchor.class_name());
    if !anchor.id().is_empty() {
        element = element.id(anchor.id());
    }
    if !anchor.target().is_empty() {
        element = element.target(anchor.target());
    }

    trace_log!("click on anchor {}", anchor.href());
    Some(element)
}

fn unavailable(what: &str) -> NavigationError {
    NavigationError::InvalidUrl {
        url: String::new(),
        message: format!("browser {} unavailable", what),
    }
}

fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|err| String::from(err.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}
