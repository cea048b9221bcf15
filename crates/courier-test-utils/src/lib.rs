// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory adapter fakes for deterministic courier tests.
//!
//! [`MemoryBroker`] and [`MemoryOfflineStore`] implement the core traits
//! without a Redis server, including a redelivery helper for simulating a
//! worker crash between read and ack.

pub mod memory_broker;
pub mod memory_offline;

pub use memory_broker::MemoryBroker;
pub use memory_offline::MemoryOfflineStore;
