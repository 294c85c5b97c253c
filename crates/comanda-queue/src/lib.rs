// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local-first command queue.
//!
//! User actions are wrapped in [`Command`] objects and drained strictly in
//! FIFO order. A failing command blocks the queue while it retries with
//! exponential backoff; commands behind it wait, preserving causal order of
//! writes. The queue itself is domain-agnostic; concrete commands live with
//! the session layer.

pub mod command;
pub mod queue;

pub use command::Command;
pub use queue::{CommandQueue, QueueSettings, QueueStatus};
