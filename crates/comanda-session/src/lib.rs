// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-order chat session.
//!
//! Ties the generic pieces together for one order's conversation: user
//! messages become queued commands, a debounced dispatcher coalesces them
//! into a single AI call, the state machine gates input modes, and the bus
//! carries notifications out to the UI.

pub mod commands;
pub mod dispatcher;
pub mod session;
pub mod settings;

pub use dispatcher::AiDispatcher;
pub use session::ChatSession;
