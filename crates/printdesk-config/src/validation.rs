// SPDX-FileCopyrightText: 2026 Printdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as interval bounds and backoff ordering.

use thiserror::Error;

use crate::model::PrintdeskConfig;

/// A configuration validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    Validation { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects all violations rather than failing fast.
pub fn validate_config(config: &PrintdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.sync.poll_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.poll_interval_ms must be greater than zero".to_string(),
        });
    }

    if config.sync.push_retry_base_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.push_retry_base_ms must be greater than zero".to_string(),
        });
    }

    if config.sync.push_retry_cap_ms < config.sync.push_retry_base_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "sync.push_retry_cap_ms ({}) must be >= sync.push_retry_base_ms ({})",
                config.sync.push_retry_cap_ms, config.sync.push_retry_base_ms
            ),
        });
    }

    if config.sync.update_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.update_capacity must be greater than zero".to_string(),
        });
    }

    if config.bus.capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "bus.capacity must be greater than zero".to_string(),
        });
    }

    let level = config.log.level.trim().to_ascii_lowercase();
    if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!("log.level `{}` is not a valid level", config.log.level),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn default_config_validates() {
        let config = PrintdeskConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = load_config_from_str("[sync]\npoll_interval_ms = 0").unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn inverted_backoff_bounds_are_rejected() {
        let config = load_config_from_str(
            "[sync]\npush_retry_base_ms = 5000\npush_retry_cap_ms = 100",
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn all_violations_are_collected() {
        let config = load_config_from_str(
            r#"
            [log]
            level = "loud"
            [storage]
            database_path = ""
            [bus]
            capacity = 0
            "#,
        )
        .unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
