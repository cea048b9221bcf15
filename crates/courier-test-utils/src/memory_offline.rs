// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory offline store fake.
//!
//! TTLs are accepted and recorded but never enforced; tests that care about
//! expiry assert on the recorded value instead of waiting.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::{CourierError, OfflineStore};

#[derive(Debug, Clone)]
struct Slot {
    recipient_id: u64,
    result: String,
    ttl: Duration,
}

/// A deterministic in-memory [`OfflineStore`].
pub struct MemoryOfflineStore {
    slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryOfflineStore {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored slots.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Whether no slots are stored.
    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }

    /// The TTL recorded for a slot, if present.
    pub async fn ttl_of(&self, task_id: &str) -> Option<Duration> {
        self.slots.lock().await.get(task_id).map(|s| s.ttl)
    }
}

impl Default for MemoryOfflineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OfflineStore for MemoryOfflineStore {
    async fn put(
        &self,
        task_id: &str,
        recipient_id: u64,
        result: &str,
        ttl: Duration,
    ) -> Result<(), CourierError> {
        self.slots.lock().await.insert(
            task_id.to_string(),
            Slot {
                recipient_id,
                result: result.to_string(),
                ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<String>, CourierError> {
        Ok(self
            .slots
            .lock()
            .await
            .get(task_id)
            .map(|s| s.result.clone()))
    }

    async fn delete(&self, task_id: &str) -> Result<(), CourierError> {
        self.slots.lock().await.remove(task_id);
        Ok(())
    }

    async fn list_task_ids(&self, recipient_id: u64) -> Result<Vec<String>, CourierError> {
        let mut ids: Vec<String> = self
            .slots
            .lock()
            .await
            .iter()
            .filter(|(_, slot)| slot.recipient_id == recipient_id)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
