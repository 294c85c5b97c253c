// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connectivity probe trait for the polling fallback of the network monitor.

use async_trait::async_trait;

/// Reports whether the remote backend is currently reachable.
///
/// Implementations should be cheap (a HEAD request against a health
/// endpoint) and must not return errors; unreachable is a normal answer,
/// not a failure.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}
