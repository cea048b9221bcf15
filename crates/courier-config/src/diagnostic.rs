// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error type surfaced at boot.

use thiserror::Error;

/// A configuration error. Any instance is fatal at boot: the binary prints
/// the message and exits non-zero.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed semantic validation.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The underlying loader rejected the sources (bad TOML, unknown key,
    /// type mismatch).
    #[error("configuration error: {0}")]
    Load(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(err.to_string())
    }
}

/// Render a list of [`ConfigError`]s to stderr, one per line.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("error: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_includes_message() {
        let err = ConfigError::Validation {
            message: "broker.address must not be empty".to_string(),
        };
        assert!(err.to_string().contains("broker.address"));
    }
}
