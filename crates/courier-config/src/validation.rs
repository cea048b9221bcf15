// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalization and validation of deserialized configuration.
//!
//! Normalization replaces out-of-range knobs with their defaults (the
//! pipeline treats a non-positive delay or an impossible schedule hour as
//! "unset", not as an error). Validation covers constraints that cannot be
//! repaired, such as an empty broker address.

use tracing::warn;

use crate::diagnostic::ConfigError;
use crate::model::{self, CourierConfig};

/// Replace out-of-range values with defaults, logging each repair.
///
/// Applied rules:
/// - `message.delay_seconds <= 0` -> 10
/// - `message.cleanup_days <= 0` -> 30
/// - `message.failed_cleanup_days <= 0` -> 7
/// - `message.cleanup_schedule_hour` outside 0..=23 -> 2
/// - `heartbeat.interval_secs == 0` -> 10
/// - `heartbeat.timeout_secs == 0` -> 30
pub fn normalize_config(config: &mut CourierConfig) {
    if config.message.delay_seconds <= 0 {
        warn!(
            value = config.message.delay_seconds,
            "message.delay_seconds out of range, using default"
        );
        config.message.delay_seconds = model::default_delay_seconds();
    }
    if config.message.cleanup_days <= 0 {
        warn!(
            value = config.message.cleanup_days,
            "message.cleanup_days out of range, using default"
        );
        config.message.cleanup_days = model::default_cleanup_days();
    }
    if config.message.failed_cleanup_days <= 0 {
        warn!(
            value = config.message.failed_cleanup_days,
            "message.failed_cleanup_days out of range, using default"
        );
        config.message.failed_cleanup_days = model::default_failed_cleanup_days();
    }
    if !(0..=23).contains(&config.message.cleanup_schedule_hour) {
        warn!(
            value = config.message.cleanup_schedule_hour,
            "message.cleanup_schedule_hour outside 0..=23, using default"
        );
        config.message.cleanup_schedule_hour = model::default_cleanup_schedule_hour();
    }
    if config.heartbeat.interval_secs == 0 {
        config.heartbeat.interval_secs = model::default_heartbeat_interval();
    }
    if config.heartbeat.timeout_secs == 0 {
        config.heartbeat.timeout_secs = model::default_heartbeat_timeout();
    }
}

/// Validate a normalized configuration for semantic correctness.
///
/// Returns all collected validation errors (does not fail fast).
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    if config.broker.address.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "broker.address must not be empty".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.broker.db < 0 {
        errors.push(ConfigError::Validation {
            message: format!("broker.db must be non-negative, got {}", config.broker.db),
        });
    }

    if config.heartbeat.timeout_secs < config.heartbeat.interval_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "heartbeat.timeout_secs ({}) must be >= heartbeat.interval_secs ({})",
                config.heartbeat.timeout_secs, config.heartbeat.interval_secs
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_repairs_non_positive_delay() {
        let mut config = CourierConfig::default();
        config.message.delay_seconds = 0;
        normalize_config(&mut config);
        assert_eq!(config.message.delay_seconds, 10);

        config.message.delay_seconds = -5;
        normalize_config(&mut config);
        assert_eq!(config.message.delay_seconds, 10);
    }

    #[test]
    fn normalize_repairs_schedule_hour() {
        let mut config = CourierConfig::default();
        config.message.cleanup_schedule_hour = 24;
        normalize_config(&mut config);
        assert_eq!(config.message.cleanup_schedule_hour, 2);

        config.message.cleanup_schedule_hour = -1;
        normalize_config(&mut config);
        assert_eq!(config.message.cleanup_schedule_hour, 2);
    }

    #[test]
    fn normalize_keeps_valid_values() {
        let mut config = CourierConfig::default();
        config.message.delay_seconds = 42;
        config.message.cleanup_schedule_hour = 23;
        normalize_config(&mut config);
        assert_eq!(config.message.delay_seconds, 42);
        assert_eq!(config.message.cleanup_schedule_hour, 23);
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = CourierConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn validate_rejects_empty_broker_address() {
        let mut config = CourierConfig::default();
        config.broker.address = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("broker.address")));
    }

    #[test]
    fn validate_collects_all_errors() {
        let mut config = CourierConfig::default();
        config.broker.address = String::new();
        config.storage.database_path = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn validate_rejects_timeout_below_interval() {
        let mut config = CourierConfig::default();
        config.heartbeat.interval_secs = 30;
        config.heartbeat.timeout_secs = 10;
        assert!(validate_config(&config).is_err());
    }
}
