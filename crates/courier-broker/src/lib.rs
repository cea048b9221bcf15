// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis adapters for the courier message backend.
//!
//! [`RedisStreamBroker`] wraps a stream with a consumer group for the
//! delayed-message queue; [`RedisOfflineStore`] holds processed results
//! awaiting pickup. Both share one multiplexed
//! [`redis::aio::ConnectionManager`], which reconnects transparently.

pub mod client;
pub mod offline;
pub mod stream;

pub use client::connect;
pub use offline::RedisOfflineStore;
pub use stream::RedisStreamBroker;
