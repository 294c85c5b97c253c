// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background synchronization.
//!
//! Pushes pending local records to the remote store in dependency order
//! (orders before their messages), uploads offline-recorded audio, and
//! triggers remote line-item extraction. A network monitor feeds the
//! scheduler, which runs a pass every interval and immediately on
//! reconnect.

pub mod engine;
pub mod monitor;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::{SyncEngine, SyncReport};
pub use monitor::NetworkMonitor;
pub use scheduler::SyncScheduler;
