// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use comanda_core::ComandaError;

/// A unit of user intent executed by the queue.
///
/// Implementations must be idempotent-friendly under retry: `execute` may
/// run several times before the queue gives up on a command.
#[async_trait]
pub trait Command: Send + Sync {
    /// Stable identifier, unique per command instance.
    fn id(&self) -> &str;

    /// Human-readable command type for logs and callbacks.
    fn kind(&self) -> &str;

    /// Per-command cap on total execution attempts; `None` uses the queue
    /// default.
    fn max_retries(&self) -> Option<u32> {
        None
    }

    async fn execute(&self) -> Result<(), ComandaError>;
}
