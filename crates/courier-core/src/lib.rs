// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the courier message backend.
//!
//! This crate provides the domain types, the error taxonomy, and the
//! adapter traits shared across the courier workspace. Concrete adapters
//! (SQLite durable store, Redis broker) implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CourierError;
pub use types::{
    DeliveryFrame, DeliveryKind, MessagePage, MessageRecord, MessageStatus, QueuedEnvelope,
};

pub use traits::{DurableStore, MessageProcessor, OfflineStore, StreamBroker, StreamEntry};
