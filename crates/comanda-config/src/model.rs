// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Comanda sync client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Comanda configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComandaConfig {
    /// Local store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Command queue retry settings.
    #[serde(default)]
    pub queue: QueueSettings,

    /// AI chat endpoint settings.
    #[serde(default)]
    pub ai: AiConfig,

    /// Circuit breaker settings for the AI call.
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Synchronization scheduling settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Local store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("comanda").join("comanda.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("comanda.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Command queue retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSettings {
    /// Maximum execution attempts before a command is dropped.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base retry delay in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Double the delay on each consecutive failure.
    #[serde(default = "default_exponential_backoff")]
    pub exponential_backoff: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            exponential_backoff: default_exponential_backoff(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_exponential_backoff() -> bool {
    true
}

/// AI chat endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    /// URL of the streaming chat endpoint.
    #[serde(default = "default_chat_endpoint")]
    pub chat_endpoint: String,

    /// URL of the audio transcription endpoint.
    #[serde(default = "default_transcription_endpoint")]
    pub transcription_endpoint: String,

    /// Bearer token for the endpoints. `None` sends no Authorization header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Debounce window in milliseconds before an AI call is scheduled.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Debounce window for the batch-response variant, in milliseconds.
    #[serde(default = "default_batch_debounce_ms")]
    pub batch_debounce_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            chat_endpoint: default_chat_endpoint(),
            transcription_endpoint: default_transcription_endpoint(),
            api_key: None,
            debounce_ms: default_debounce_ms(),
            batch_debounce_ms: default_batch_debounce_ms(),
        }
    }
}

fn default_chat_endpoint() -> String {
    "http://localhost:3000/api/chat".to_string()
}

fn default_transcription_endpoint() -> String {
    "http://localhost:3000/api/process-audio".to_string()
}

fn default_debounce_ms() -> u64 {
    2500
}

fn default_batch_debounce_ms() -> u64 {
    15_000
}

/// Circuit breaker configuration for the AI call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BreakerConfig {
    /// Failures within the monitoring period before the circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,

    /// Milliseconds the circuit stays open before a half-open trial.
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,

    /// Milliseconds over which failures are counted.
    #[serde(default = "default_monitoring_period_ms")]
    pub monitoring_period_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            monitoring_period_ms: default_monitoring_period_ms(),
        }
    }
}

fn default_failure_threshold() -> usize {
    3
}

fn default_reset_timeout_ms() -> u64 {
    30_000
}

fn default_monitoring_period_ms() -> u64 {
    60_000
}

/// Synchronization scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Seconds between periodic sync passes while online.
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,

    /// Seconds between connectivity probe polls.
    #[serde(default = "default_connectivity_poll_secs")]
    pub connectivity_poll_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval_secs(),
            connectivity_poll_secs: default_connectivity_poll_secs(),
        }
    }
}

fn default_sync_interval_secs() -> u64 {
    30
}

fn default_connectivity_poll_secs() -> u64 {
    10
}
