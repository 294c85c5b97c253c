// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for out-of-scope collaborators.
//!
//! The sync engine and network monitor depend on these seams instead of
//! concrete backends, so collaborators are injected explicitly rather than
//! resolved dynamically. All traits use `#[async_trait]` for dynamic
//! dispatch compatibility.

pub mod connectivity;
pub mod remote;

pub use connectivity::ConnectivityProbe;
pub use remote::RemoteStore;
