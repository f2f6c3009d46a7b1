//! Subscriber registries
//!
//! Both the history coordinator and the router own a set of named events.
//! [`EventRegistry`] keeps, per event kind, the ordered list of subscribers
//! together with the [`SubscriptionId`] handed back by `on` so `off` can
//! remove exactly that subscriber.
//!
//! Dispatch goes through [`EventRegistry::snapshot`]: callers clone the
//! subscriber list out of their `RefCell`, release the borrow, and only then
//! invoke the callbacks, so a callback is free to subscribe, unsubscribe or
//! navigate.

use crate::error_log;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Opaque handle identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Event kind → ordered subscribers
pub struct EventRegistry<K, H: ?Sized> {
    subscribers: HashMap<K, Vec<(SubscriptionId, Rc<H>)>>,
}

impl<K, H> EventRegistry<K, H>
where
    K: Eq + Hash + Copy,
    H: ?Sized,
{
    pub fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, kind: K, id: SubscriptionId, handler: Rc<H>) {
        self.subscribers.entry(kind).or_default().push((id, handler));
    }

    /// Remove one subscription; returns whether it existed
    pub fn unsubscribe(&mut self, kind: K, id: SubscriptionId) -> bool {
        let Some(list) = self.subscribers.get_mut(&kind) else {
            return false;
        };

        match list.iter().position(|(sub, _)| *sub == id) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    /// Subscribers for `kind` in dispatch order (most recent first)
    pub fn snapshot(&self, kind: K) -> Vec<Rc<H>> {
        self.subscribers
            .get(&kind)
            .map(|list| list.iter().rev().map(|(_, h)| Rc::clone(h)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, kind: K) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, kind: K) -> bool {
        self.len(kind) == 0
    }
}

impl<K, H> Default for EventRegistry<K, H>
where
    K: Eq + Hash + Copy,
    H: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Run one subscriber, containing a panic so the remaining subscribers still run
///
/// Returns `false` if the subscriber panicked.
pub(crate) fn invoke_contained(event: &str, f: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error_log!("'{}' subscriber panicked: {}", event, message);
            false
        }
    }
}
