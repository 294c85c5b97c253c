// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths, positive windows, and sane retry
//! counts.

use crate::diagnostic::ConfigError;
use crate::model::ComandaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ComandaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.queue.max_retries == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.max_retries must be at least 1".to_string(),
        });
    }

    if config.queue.retry_delay_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.retry_delay_ms must be positive".to_string(),
        });
    }

    if config.ai.chat_endpoint.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "ai.chat_endpoint must not be empty".to_string(),
        });
    }

    if config.ai.debounce_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "ai.debounce_ms must be positive".to_string(),
        });
    }

    if config.ai.batch_debounce_ms < config.ai.debounce_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "ai.batch_debounce_ms ({}) must not be shorter than ai.debounce_ms ({})",
                config.ai.batch_debounce_ms, config.ai.debounce_ms
            ),
        });
    }

    if config.breaker.failure_threshold == 0 {
        errors.push(ConfigError::Validation {
            message: "breaker.failure_threshold must be at least 1".to_string(),
        });
    }

    if config.breaker.monitoring_period_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "breaker.monitoring_period_ms must be positive".to_string(),
        });
    }

    if config.sync.interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.interval_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = ComandaConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = ComandaConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn zero_retries_fails_validation() {
        let mut config = ComandaConfig::default();
        config.queue.max_retries = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("max_retries"))
        ));
    }

    #[test]
    fn batch_debounce_shorter_than_debounce_fails() {
        let mut config = ComandaConfig::default();
        config.ai.debounce_ms = 5000;
        config.ai.batch_debounce_ms = 1000;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("batch_debounce_ms"))
        ));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = ComandaConfig::default();
        config.storage.database_path = "".to_string();
        config.queue.max_retries = 0;
        config.breaker.failure_threshold = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = ComandaConfig::default();
        config.storage.database_path = "/tmp/test.db".to_string();
        config.ai.debounce_ms = 1000;
        config.sync.interval_secs = 60;
        assert!(validate_config(&config).is_ok());
    }
}
