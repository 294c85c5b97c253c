// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous publish/subscribe hub.
//!
//! Handlers run inline on the publisher's thread, in registration order.
//! A panicking handler is caught and logged; remaining handlers still run.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::error;

use crate::event::{ChatEvent, ChatEventKind};

type Handler = Arc<dyn Fn(&ChatEvent) + Send + Sync>;

/// Token returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: ChatEventKind,
    id: u64,
}

#[derive(Default)]
struct Registry {
    handlers: HashMap<ChatEventKind, Vec<(u64, Handler)>>,
}

/// Shared in-process event bus.
///
/// Cloning is cheap; all clones publish into the same handler registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one event kind. Handlers for the same kind
    /// run in the order they were registered.
    pub fn subscribe<F>(&self, kind: ChatEventKind, handler: F) -> Subscription
    where
        F: Fn(&ChatEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry
            .handlers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription { kind, id }
    }

    /// Removes a previously registered handler. Unknown tokens are ignored.
    pub fn unsubscribe(&self, sub: Subscription) {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handlers) = registry.handlers.get_mut(&sub.kind) {
            handlers.retain(|(id, _)| *id != sub.id);
        }
    }

    /// Delivers an event to every handler subscribed to its kind.
    ///
    /// The handler list is snapshotted up front, so handlers registered or
    /// removed during delivery take effect on the next publish.
    pub fn publish(&self, event: &ChatEvent) {
        let kind = event.kind();
        // Snapshot outside the lock so handlers may re-enter the bus
        // (subscribe, publish) without deadlocking.
        let snapshot: Vec<Handler> = {
            let guard = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            guard
                .handlers
                .get(&kind)
                .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        for handler in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(kind = %kind, detail, "event handler panicked");
            }
        }
    }
}
