// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FIFO drain loop with blocking retry.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use comanda_core::ComandaError;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::command::Command;

/// Retry tuning for the queue.
#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    /// Maximum execution attempts per command, for commands that do not
    /// specify their own cap.
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub retry_delay: Duration,
    /// Double the delay on each subsequent retry.
    pub exponential_backoff: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            exponential_backoff: true,
        }
    }
}

/// Point-in-time queue snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    /// Commands waiting behind the current one.
    pub pending: usize,
    /// Commands mid-execution (0 or 1; the queue is strictly serial).
    pub executing: usize,
    /// Waiting plus executing.
    pub total: usize,
}

type ExecutedCallback = Box<dyn Fn(&dyn Command) + Send + Sync>;
type FailedCallback = Box<dyn Fn(&dyn Command, &ComandaError) + Send + Sync>;

/// Strictly ordered command queue.
///
/// `enqueue` pushes and, if no drain is in flight, drains inline until the
/// queue is empty. Callers that enqueue while another drain is running
/// return immediately; the running drain picks up their command.
pub struct CommandQueue {
    settings: QueueSettings,
    pending: Mutex<VecDeque<Box<dyn Command>>>,
    processing: AtomicBool,
    on_executed: Mutex<Option<ExecutedCallback>>,
    on_failed: Mutex<Option<FailedCallback>>,
}

impl CommandQueue {
    pub fn new(settings: QueueSettings) -> Self {
        Self {
            settings,
            pending: Mutex::new(VecDeque::new()),
            processing: AtomicBool::new(false),
            on_executed: Mutex::new(None),
            on_failed: Mutex::new(None),
        }
    }

    /// Called after a command succeeds.
    pub fn set_on_executed<F>(&self, f: F)
    where
        F: Fn(&dyn Command) + Send + Sync + 'static,
    {
        *self.on_executed.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(f));
    }

    /// Called after a command exhausts its retries.
    pub fn set_on_failed<F>(&self, f: F)
    where
        F: Fn(&dyn Command, &ComandaError) + Send + Sync + 'static,
    {
        *self.on_failed.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(f));
    }

    /// Appends a command and drains the queue if nothing else is draining.
    pub async fn enqueue(&self, command: Box<dyn Command>) {
        debug!(id = command.id(), kind = command.kind(), "command enqueued");
        self.lock_pending().push_back(command);

        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.drain().await;
        }
    }

    /// Drops all pending commands. An in-flight command finishes normally.
    pub fn clear(&self) {
        let dropped = {
            let mut pending = self.lock_pending();
            let n = pending.len();
            pending.clear();
            n
        };
        if dropped > 0 {
            debug!(dropped, "command queue cleared");
        }
    }

    pub fn status(&self) -> QueueStatus {
        let pending = self.lock_pending().len();
        let executing = usize::from(self.processing.load(Ordering::Acquire));
        QueueStatus {
            pending,
            executing,
            total: pending + executing,
        }
    }

    // Runs with the `processing` flag held; releases it on exit. The
    // release/re-check dance closes the race where a command is enqueued
    // between seeing the queue empty and clearing the flag. The guard
    // releases the flag if this future is dropped mid-command; without it
    // no later enqueue could ever drain again.
    async fn drain(&self) {
        let mut guard = ProcessingGuard {
            flag: &self.processing,
            armed: true,
        };
        loop {
            let Some(command) = self.lock_pending().pop_front() else {
                self.processing.store(false, Ordering::Release);
                guard.armed = false;
                let refilled = !self.lock_pending().is_empty()
                    && self
                        .processing
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok();
                if refilled {
                    guard.armed = true;
                    continue;
                }
                return;
            };
            self.run_with_retries(command.as_ref()).await;
        }
    }

    async fn run_with_retries(&self, command: &dyn Command) {
        let max_retries = command.max_retries().unwrap_or(self.settings.max_retries);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match command.execute().await {
                Ok(()) => {
                    debug!(id = command.id(), kind = command.kind(), attempt, "command executed");
                    if let Some(cb) = self
                        .on_executed
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .as_ref()
                    {
                        cb(command);
                    }
                    return;
                }
                Err(e) if attempt < max_retries => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        id = command.id(),
                        kind = command.kind(),
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "command failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    warn!(
                        id = command.id(),
                        kind = command.kind(),
                        attempts = attempt,
                        error = %e,
                        "command failed terminally"
                    );
                    if let Some(cb) = self
                        .on_failed
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .as_ref()
                    {
                        cb(command, &e);
                    }
                    return;
                }
            }
        }
    }

    fn backoff_delay(&self, retry: u32) -> Duration {
        if self.settings.exponential_backoff {
            self.settings.retry_delay * 2u32.saturating_pow(retry.saturating_sub(1))
        } else {
            self.settings.retry_delay
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, VecDeque<Box<dyn Command>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
    armed: bool,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(false, Ordering::Release);
        }
    }
}
