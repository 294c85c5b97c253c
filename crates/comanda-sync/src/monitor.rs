// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connectivity tracking.
//!
//! Online state is a `watch` channel: the scheduler subscribes, the host
//! application pushes platform online/offline notifications via
//! [`NetworkMonitor::set_online`], and an optional polling task covers
//! platforms without such notifications. Every change is also published on
//! the event bus for UI consumers.

use std::sync::Arc;
use std::time::Duration;

use comanda_bus::{ChatEvent, EventBus};
use comanda_core::traits::ConnectivityProbe;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Tracks whether the remote backend is reachable.
pub struct NetworkMonitor {
    online: watch::Sender<bool>,
    bus: EventBus,
}

impl NetworkMonitor {
    pub fn new(initially_online: bool, bus: EventBus) -> Self {
        Self {
            online: watch::Sender::new(initially_online),
            bus,
        }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Receiver that yields on every online/offline flip.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Push a platform connectivity notification. No-op if unchanged.
    pub fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "connectivity changed");
            self.bus.publish(&ChatEvent::ConnectionChanged { online });
        }
    }

    /// Spawns a polling fallback that probes reachability every `interval`.
    pub fn spawn_polling(
        self: &Arc<Self>,
        probe: Arc<dyn ConnectivityProbe>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("connectivity polling stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        monitor.set_online(probe.is_reachable().await);
                    }
                }
            }
        })
    }
}
