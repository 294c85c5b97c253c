// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process event bus.
//!
//! Decouples the chat session, command queue, and sync engine from UI-facing
//! consumers. Delivery is synchronous and best-effort; the bus is not a
//! durable queue.

pub mod bus;
pub mod event;

pub use bus::{EventBus, Subscription};
pub use event::{ChatEvent, ChatEventKind};
