// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis implementation of the [`OfflineStore`] trait.
//!
//! Each result lives under `offline:result:<task_id>` with a TTL. A
//! per-recipient index set (`offline:recipient:<id>`, same TTL) backs the
//! reconnect drain; members whose value key has already been consumed are
//! skipped by callers, so the index may run slightly stale without harm.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use courier_core::{CourierError, OfflineStore};

/// Prefix for result value keys.
pub const RESULT_KEY_PREFIX: &str = "offline:result:";
/// Prefix for per-recipient index sets.
pub const INDEX_KEY_PREFIX: &str = "offline:recipient:";

fn result_key(task_id: &str) -> String {
    format!("{RESULT_KEY_PREFIX}{task_id}")
}

fn index_key(recipient_id: u64) -> String {
    format!("{INDEX_KEY_PREFIX}{recipient_id}")
}

/// Redis offline result store.
pub struct RedisOfflineStore {
    conn: ConnectionManager,
}

impl RedisOfflineStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl OfflineStore for RedisOfflineStore {
    async fn put(
        &self,
        task_id: &str,
        recipient_id: u64,
        result: &str,
        ttl: Duration,
    ) -> Result<(), CourierError> {
        let mut conn = self.conn.clone();
        let ttl_secs = ttl.as_secs().max(1);
        redis::pipe()
            .cmd("SET")
            .arg(result_key(task_id))
            .arg(result)
            .arg("EX")
            .arg(ttl_secs)
            .ignore()
            .cmd("SADD")
            .arg(index_key(recipient_id))
            .arg(task_id)
            .ignore()
            .cmd("EXPIRE")
            .arg(index_key(recipient_id))
            .arg(ttl_secs)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CourierError::broker("offline store write failed", e))?;
        debug!(task_id, recipient_id, "offline result stored");
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<String>, CourierError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(result_key(task_id))
            .await
            .map_err(|e| CourierError::broker("offline store read failed", e))?;
        Ok(value)
    }

    async fn delete(&self, task_id: &str) -> Result<(), CourierError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .del(result_key(task_id))
            .await
            .map_err(|e| CourierError::broker("offline store delete failed", e))?;
        Ok(())
    }

    async fn list_task_ids(&self, recipient_id: u64) -> Result<Vec<String>, CourierError> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn
            .smembers(index_key(recipient_id))
            .await
            .map_err(|e| CourierError::broker("offline store index read failed", e))?;
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats_match_wire_contract() {
        assert_eq!(
            result_key("550e8400-e29b-41d4-a716-446655440000"),
            "offline:result:550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(index_key(42), "offline:recipient:42");
    }
}
