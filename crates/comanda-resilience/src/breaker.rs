// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Three-state circuit breaker.
//!
//! Closed: calls pass through, failures are counted within a sliding
//! monitoring window. Open: calls are rejected immediately until the reset
//! timeout elapses. Half-open: one probe call is allowed; success closes
//! the circuit and clears the failure history, failure reopens it.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use comanda_core::ComandaError;
use strum::Display;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Breaker tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct BreakerSettings {
    /// Consecutive-window failure count that trips the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before allowing a probe.
    pub reset_timeout: Duration,
    /// Sliding window; failures older than this are forgotten.
    pub monitoring_period: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(30),
            monitoring_period: Duration::from_secs(60),
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    failures: Vec<Instant>,
    opened_at: Option<Instant>,
}

/// Circuit breaker guarding a single remote dependency.
pub struct CircuitBreaker {
    settings: BreakerSettings,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: Vec::new(),
                opened_at: None,
            }),
        }
    }

    /// Runs `op` through the breaker.
    ///
    /// Returns [`ComandaError::CircuitOpen`] without invoking `op` while the
    /// circuit is open. The operation's own error is passed through
    /// unchanged when it runs and fails.
    pub async fn execute<F, Fut, T>(&self, op: F) -> Result<T, ComandaError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ComandaError>>,
    {
        self.before_call()?;
        match op().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure();
                Err(e)
            }
        }
    }

    /// Current state, advancing open -> half-open if the timeout elapsed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.maybe_enter_half_open(&mut inner);
        inner.state
    }

    /// Forces the breaker closed and clears the failure history.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.state = CircuitState::Closed;
        inner.failures.clear();
        inner.opened_at = None;
        debug!("circuit breaker reset to closed");
    }

    fn before_call(&self) -> Result<(), ComandaError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.maybe_enter_half_open(&mut inner);
        match inner.state {
            CircuitState::Open => Err(ComandaError::CircuitOpen),
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
        }
    }

    fn maybe_enter_half_open(&self, inner: &mut Inner) {
        if inner.state == CircuitState::Open
            && let Some(opened_at) = inner.opened_at
            && opened_at.elapsed() >= self.settings.reset_timeout
        {
            inner.state = CircuitState::HalfOpen;
            debug!("circuit breaker entering half-open");
        }
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            inner.failures.clear();
            inner.opened_at = None;
            debug!("circuit breaker closed after successful probe");
        }
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        inner.failures.push(now);
        let window = self.settings.monitoring_period;
        inner
            .failures
            .retain(|t| now.duration_since(*t) <= window);

        let tripped = match inner.state {
            // A failed probe reopens immediately.
            CircuitState::HalfOpen => true,
            CircuitState::Closed => {
                inner.failures.len() as u32 >= self.settings.failure_threshold
            }
            CircuitState::Open => false,
        };
        if tripped {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(now);
            warn!(
                failures = inner.failures.len(),
                "circuit breaker opened"
            );
        }
    }
}
