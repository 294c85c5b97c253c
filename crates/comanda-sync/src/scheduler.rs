// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic and reconnect-driven sync scheduling.
//!
//! Runs a pass every `interval` while online, and immediately when the
//! monitor reports a reconnect. Offline ticks are skipped; the engine's
//! single-flight guard absorbs the case where a tick and a reconnect race.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::SyncEngine;

pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    online: watch::Receiver<bool>,
    interval: Duration,
    cancel: CancellationToken,
}

impl SyncScheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        online: watch::Receiver<bool>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            online,
            interval,
            cancel,
        }
    }

    /// Spawns the scheduling loop. Returns when cancelled or when the
    /// network monitor is dropped.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; consume it so startup does
            // not race the caller's initial explicit sync.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        info!("sync scheduler stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        if *self.online.borrow() {
                            debug!("periodic sync tick");
                            self.engine.sync().await;
                        } else {
                            debug!("skipping sync tick while offline");
                        }
                    }
                    changed = self.online.changed() => {
                        if changed.is_err() {
                            info!("network monitor dropped, sync scheduler stopped");
                            return;
                        }
                        if *self.online.borrow_and_update() {
                            info!("back online, syncing immediately");
                            self.engine.sync().await;
                        }
                    }
                }
            }
        })
    }
}
