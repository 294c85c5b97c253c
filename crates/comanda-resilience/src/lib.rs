// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Circuit breaker for remote calls.
//!
//! Wraps fallible async operations and fails fast once the remote endpoint
//! has proven unhealthy, instead of letting every queued command burn its
//! full retry budget against a dead service.

pub mod breaker;

pub use breaker::{BreakerSettings, CircuitBreaker, CircuitState};
