// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state machine.
//!
//! Tracks where one order's chat flow sits (idle, composing, waiting on the
//! assistant, streaming, error) and rejects events that make no sense in the
//! current state instead of letting the UI race itself.

pub mod machine;

pub use machine::{ConversationEvent, ConversationState, ConversationStateMachine, ListenerHandle};
