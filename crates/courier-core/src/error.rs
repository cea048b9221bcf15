// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the courier message backend.

use thiserror::Error;

/// The primary error type used across all courier adapter traits and core
/// operations.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, bad values). Fatal at boot.
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A row with the same task id already exists.
    #[error("duplicate task id: {task_id}")]
    Duplicate { task_id: String },

    /// No row exists for the requested task id.
    #[error("task not found: {task_id}")]
    NotFound { task_id: String },

    /// Stream broker or offline store errors (connection, command failure).
    #[error("broker error: {message}")]
    Broker {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The processor returned an error or exceeded its deadline.
    #[error("processor error: {message}")]
    Processor { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Wrap an arbitrary error as a broker failure with context.
    pub fn broker(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Broker {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_task_id() {
        let err = CourierError::Duplicate {
            task_id: "abc-123".into(),
        };
        assert!(err.to_string().contains("abc-123"));

        let err = CourierError::NotFound {
            task_id: "def-456".into(),
        };
        assert!(err.to_string().contains("def-456"));
    }

    #[test]
    fn broker_helper_carries_source() {
        let err = CourierError::broker("enqueue failed", std::io::Error::other("boom"));
        match err {
            CourierError::Broker { message, source } => {
                assert_eq!(message, "enqueue failed");
                assert!(source.is_some());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
