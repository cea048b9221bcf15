// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline store trait for processed results awaiting pickup.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CourierError;

/// Short-TTL key/value seam holding results for recipients who were not
/// live at processing time.
///
/// At most one slot exists per task id; it is deleted on the first
/// successful read (reconnect drain or HTTP pickup). The TTL bounds
/// recovery cost if the recipient never returns -- the durable store still
/// carries the authoritative record.
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// Stores a result slot. Overwrite-on-collision is safe. The recipient
    /// id feeds the per-recipient index used by [`OfflineStore::list_task_ids`].
    async fn put(
        &self,
        task_id: &str,
        recipient_id: u64,
        result: &str,
        ttl: Duration,
    ) -> Result<(), CourierError>;

    /// Returns the stored result, or `None` if absent or expired.
    async fn get(&self, task_id: &str) -> Result<Option<String>, CourierError>;

    /// Deletes the slot. Idempotent.
    async fn delete(&self, task_id: &str) -> Result<(), CourierError>;

    /// Returns the outstanding task ids for a recipient. May include ids
    /// whose slot has already been consumed; callers skip misses.
    async fn list_task_ids(&self, recipient_id: u64) -> Result<Vec<String>, CourierError>;
}
