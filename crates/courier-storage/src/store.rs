// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`DurableStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use courier_core::{CourierError, DurableStore, MessagePage, MessageRecord, MessageStatus};

use crate::database::Database;
use crate::queries;

/// SQLite-backed durable store.
///
/// Wraps a [`Database`] handle and delegates all operations to the typed
/// query module. Constructed once at boot and shared via `Arc`.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the store at `path`, running migrations.
    pub async fn open(path: &str) -> Result<Self, CourierError> {
        let db = Database::open(path).await?;
        debug!(path, "durable store opened");
        Ok(Self { db })
    }

    /// Checkpoint and close the underlying database.
    pub async fn close(&self) -> Result<(), CourierError> {
        self.db.close().await
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn insert(
        &self,
        task_id: &str,
        recipient_id: u64,
        body: &str,
    ) -> Result<(), CourierError> {
        queries::messages::insert(&self.db, task_id, recipient_id, body).await
    }

    async fn complete(&self, task_id: &str, result: &str) -> Result<(), CourierError> {
        queries::messages::complete(&self.db, task_id, result).await
    }

    async fn mark_failed(&self, task_id: &str) -> Result<(), CourierError> {
        queries::messages::mark_failed(&self.db, task_id).await
    }

    async fn get(&self, task_id: &str) -> Result<Option<MessageRecord>, CourierError> {
        queries::messages::get(&self.db, task_id).await
    }

    async fn list_by_recipient(
        &self,
        recipient_id: u64,
        page: i64,
        limit: i64,
        status: Option<MessageStatus>,
    ) -> Result<MessagePage, CourierError> {
        queries::messages::list_by_recipient(&self.db, recipient_id, page, limit, status).await
    }

    async fn delete_older_than(
        &self,
        status: MessageStatus,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, CourierError> {
        queries::messages::delete_older_than(&self.db, status, cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn full_record_lifecycle_through_trait() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let store = SqliteStore::open(db_path.to_str().unwrap()).await.unwrap();
        let store: &dyn DurableStore = &store;

        store.insert("task-1", 7, "hello").await.unwrap();

        let record = store.get("task-1").await.unwrap().unwrap();
        assert_eq!(record.status, MessageStatus::Pending);

        store.complete("task-1", "processed: hello").await.unwrap();
        let record = store.get("task-1").await.unwrap().unwrap();
        assert_eq!(record.status, MessageStatus::Completed);
        assert_eq!(record.content, "processed: hello");

        let page = store.list_by_recipient(7, 1, 10, None).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn open_twice_on_same_path_reuses_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reuse.db");

        {
            let store = SqliteStore::open(db_path.to_str().unwrap()).await.unwrap();
            store.insert("task-persist", 3, "kept").await.unwrap();
            store.close().await.unwrap();
        }

        let store = SqliteStore::open(db_path.to_str().unwrap()).await.unwrap();
        let record = store.get("task-persist").await.unwrap().unwrap();
        assert_eq!(record.content, "kept");
        store.close().await.unwrap();
    }
}
