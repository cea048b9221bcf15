// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the courier seams.
//!
//! The engine depends only on these traits; concrete backends (SQLite,
//! Redis) and the in-memory test fakes implement them. All traits use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod broker;
pub mod offline;
pub mod processor;
pub mod store;

// Re-export all traits at the traits module level for convenience.
pub use broker::{StreamBroker, StreamEntry};
pub use offline::OfflineStore;
pub use processor::MessageProcessor;
pub use store::DurableStore;
