// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the courier message backend.
//!
//! Loads a layered TOML hierarchy with `COURIER_` environment overrides,
//! then normalizes out-of-range knobs (delay floor, schedule-hour clamp)
//! and validates the rest. Validation failures are fatal at boot.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::ConfigError;
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CourierConfig;
pub use validation::{normalize_config, validate_config};
