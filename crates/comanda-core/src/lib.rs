// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Comanda offline-first ordering client.
//!
//! This crate provides the error type, the local data model (orders,
//! messages, order items tagged with a sync status), and the trait
//! definitions for remote collaborators that the synchronization engine
//! and command layer depend on.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ComandaError;
pub use types::{
    CommandStatus, LocalMessage, LocalOrder, LocalOrderItem, MessageKind, MessageRole,
    OrderStatus, RemoteMessage, SyncStatus,
};

pub use traits::{ConnectivityProbe, RemoteStore};
