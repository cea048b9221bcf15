// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable store trait for message record persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CourierError;
use crate::types::{MessagePage, MessageRecord, MessageStatus};

/// Persistence seam for [`MessageRecord`] rows.
///
/// The engine is the single writer for status transitions; the ingest and
/// query handlers and the retention sweeper are readers (the sweeper also
/// hard-deletes). Implementations are externally synchronized.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Creates a row in `Pending` holding the request body.
    ///
    /// Fails with [`CourierError::Duplicate`] on a task id collision; the
    /// caller retries allocation.
    async fn insert(
        &self,
        task_id: &str,
        recipient_id: u64,
        body: &str,
    ) -> Result<(), CourierError>;

    /// Transitions `Pending -> Completed`, overwriting `content` with the
    /// result and stamping `processed_at`.
    ///
    /// Idempotent on redelivery: a second call on a completed row leaves it
    /// unchanged and returns success.
    async fn complete(&self, task_id: &str, result: &str) -> Result<(), CourierError>;

    /// Transitions `Pending -> Failed`, stamping `processed_at`. No-op on a
    /// non-pending row.
    async fn mark_failed(&self, task_id: &str) -> Result<(), CourierError>;

    /// Returns the live record for a task id, or `None`.
    async fn get(&self, task_id: &str) -> Result<Option<MessageRecord>, CourierError>;

    /// Lists a recipient's records newest-first.
    ///
    /// `page` is clamped to >= 1 and `limit` to 1..=100.
    async fn list_by_recipient(
        &self,
        recipient_id: u64,
        page: i64,
        limit: i64,
        status: Option<MessageStatus>,
    ) -> Result<MessagePage, CourierError>;

    /// Hard-deletes rows in `status` whose terminal timestamp precedes
    /// `cutoff`, bypassing the soft-delete tombstone. Returns the count.
    async fn delete_older_than(
        &self,
        status: MessageStatus,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, CourierError>;
}
