// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters from the loaded configuration to component settings.
//!
//! Config structs carry raw milliseconds and counts; the components take
//! `Duration`s and their own settings types. The mapping lives here so the
//! config crate stays free of component dependencies.

use std::time::Duration;

use comanda_ai::ChatClient;
use comanda_config::{AiConfig, BreakerConfig, ComandaConfig, StorageConfig};
use comanda_core::ComandaError;
use comanda_queue::QueueSettings;
use comanda_resilience::BreakerSettings;
use comanda_storage::Database;

pub fn queue_settings(cfg: &ComandaConfig) -> QueueSettings {
    QueueSettings {
        max_retries: cfg.queue.max_retries,
        retry_delay: Duration::from_millis(cfg.queue.retry_delay_ms),
        exponential_backoff: cfg.queue.exponential_backoff,
    }
}

pub fn breaker_settings(cfg: &BreakerConfig) -> BreakerSettings {
    BreakerSettings {
        failure_threshold: cfg.failure_threshold as u32,
        reset_timeout: Duration::from_millis(cfg.reset_timeout_ms),
        monitoring_period: Duration::from_millis(cfg.monitoring_period_ms),
    }
}

pub fn debounce_window(cfg: &AiConfig) -> Duration {
    Duration::from_millis(cfg.debounce_ms)
}

/// Builds the AI client from the `[ai]` section.
pub fn chat_client(cfg: &AiConfig) -> Result<ChatClient, ComandaError> {
    ChatClient::new(
        cfg.chat_endpoint.clone(),
        cfg.transcription_endpoint.clone(),
        cfg.api_key.as_deref(),
    )
}

/// Opens the local store described by the `[storage]` section.
pub async fn open_database(cfg: &StorageConfig) -> Result<Database, ComandaError> {
    Database::open_with(&cfg.database_path, cfg.wal_mode).await
}
