// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounced AI dispatch.
//!
//! Rapid-fire user messages reset a timer instead of each triggering a
//! completion; only an uninterrupted quiet window enqueues one AI call for
//! the whole burst. While offline nothing is scheduled at all: queued
//! messages wait in the local store and the sync engine handles them.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use comanda_queue::{Command, CommandQueue};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type CommandFactory = Arc<dyn Fn() -> Box<dyn Command> + Send + Sync>;

pub struct AiDispatcher {
    queue: Arc<CommandQueue>,
    factory: CommandFactory,
    debounce: Duration,
    online: watch::Receiver<bool>,
    pending: Mutex<Option<CancellationToken>>,
}

impl AiDispatcher {
    pub fn new(
        queue: Arc<CommandQueue>,
        factory: CommandFactory,
        debounce: Duration,
        online: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            factory,
            debounce,
            online,
            pending: Mutex::new(None),
        }
    }

    /// (Re)starts the debounce window. Each call pushes the dispatch out by
    /// the full window; a burst of messages yields one AI call.
    pub fn schedule(&self) {
        if !*self.online.borrow() {
            debug!("offline, suppressing AI dispatch");
            return;
        }

        let queue = Arc::clone(&self.queue);
        let factory = Arc::clone(&self.factory);
        let debounce = self.debounce;
        let token = CancellationToken::new();
        let timer = token.clone();
        // Cancellation only interrupts the sleeping timer. Once the window
        // has elapsed the dispatch is committed: the enqueue (and the drain
        // it may run inline) must never be torn down mid-flight, or the
        // queue's processing flag would be left held forever.
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }
            debug!("debounce elapsed, enqueueing AI call");
            queue.enqueue(factory()).await;
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(token) {
            previous.cancel();
        }
    }

    /// Cancels a not-yet-fired dispatch, if any. A dispatch whose window has
    /// already elapsed is unaffected.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = pending.take() {
            token.cancel();
            debug!("pending AI dispatch cancelled");
        }
    }
}

impl Drop for AiDispatcher {
    fn drop(&mut self) {
        self.cancel();
    }
}
