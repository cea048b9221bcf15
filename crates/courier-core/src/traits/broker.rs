// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream broker trait over a log-structured queue with consumer groups.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::QueuedEnvelope;

/// One entry delivered to a consumer: the broker-assigned id (opaque to the
/// rest of the system) and the raw payload of its `data` field.
#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub id: String,
    pub payload: String,
}

/// Seam over the append-only stream the worker consumes from.
///
/// Entries stay on the consumer's pending list until acked and are eligible
/// for redelivery after a crash, so consumers must tolerate seeing the same
/// envelope more than once.
#[async_trait]
pub trait StreamBroker: Send + Sync {
    /// Creates the stream and the consumer group if absent. Idempotent: an
    /// "already exists" reply from the broker is absorbed.
    async fn init(&self) -> Result<(), CourierError>;

    /// Appends one entry carrying the JSON-encoded envelope and returns the
    /// broker-assigned entry id.
    async fn enqueue(&self, envelope: &QueuedEnvelope) -> Result<String, CourierError>;

    /// Blocks up to `block` and returns up to `max_count` entries newly
    /// delivered to `consumer`. An empty batch after the block timeout is a
    /// normal return, not an error.
    async fn consume_batch(
        &self,
        consumer: &str,
        max_count: usize,
        block: Duration,
    ) -> Result<Vec<StreamEntry>, CourierError>;

    /// Marks the entry as processed for the group, removing it from the
    /// consumer's pending list.
    async fn ack(&self, entry_id: &str) -> Result<(), CourierError>;

    /// Releases the broker client. Unacked entries redeliver after restart.
    async fn shutdown(&self) -> Result<(), CourierError>;
}
