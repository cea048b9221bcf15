// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the courier message backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Out-of-range values are not errors here; they
//! are replaced with defaults by [`crate::validation::normalize_config`].

use serde::{Deserialize, Serialize};

/// Top-level courier configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Stream broker / offline store connection settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Durable store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Delay and retention knobs for the message pipeline.
    #[serde(default)]
    pub message: MessageConfig,

    /// Connection registry heartbeat cadence.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Stream broker and offline store connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// Broker address as `host:port`.
    #[serde(default = "default_broker_address")]
    pub address: String,

    /// Broker password. `None` for unauthenticated brokers.
    #[serde(default)]
    pub password: Option<String>,

    /// Logical database index.
    #[serde(default)]
    pub db: i64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            address: default_broker_address(),
            password: None,
            db: 0,
        }
    }
}

fn default_broker_address() -> String {
    "127.0.0.1:6379".to_string()
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "courier.db".to_string()
}

/// Delay and retention configuration for the message pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MessageConfig {
    /// Seconds between ingest and scheduled processing. Values <= 0 are
    /// replaced with the default.
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: i64,

    /// Age in days past which completed rows are swept.
    #[serde(default = "default_cleanup_days")]
    pub cleanup_days: i64,

    /// Age in days past which failed rows are swept.
    #[serde(default = "default_failed_cleanup_days")]
    pub failed_cleanup_days: i64,

    /// Local-time hour (0..=23) of the daily sweep tick.
    #[serde(default = "default_cleanup_schedule_hour")]
    pub cleanup_schedule_hour: i64,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            delay_seconds: default_delay_seconds(),
            cleanup_days: default_cleanup_days(),
            failed_cleanup_days: default_failed_cleanup_days(),
            cleanup_schedule_hour: default_cleanup_schedule_hour(),
        }
    }
}

pub(crate) fn default_delay_seconds() -> i64 {
    10
}

pub(crate) fn default_cleanup_days() -> i64 {
    30
}

pub(crate) fn default_failed_cleanup_days() -> i64 {
    7
}

pub(crate) fn default_cleanup_schedule_hour() -> i64 {
    2
}

/// Connection registry heartbeat configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatConfig {
    /// Seconds between protocol pings to each live connection.
    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,

    /// Seconds of inactivity after which a connection is evicted.
    #[serde(default = "default_heartbeat_timeout")]
    pub timeout_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_heartbeat_interval(),
            timeout_secs: default_heartbeat_timeout(),
        }
    }
}

pub(crate) fn default_heartbeat_interval() -> u64 {
    10
}

pub(crate) fn default_heartbeat_timeout() -> u64 {
    30
}
