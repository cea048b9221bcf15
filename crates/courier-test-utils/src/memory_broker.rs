// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory stream broker fake with consumer-group semantics.
//!
//! Entries move from the ready queue to a pending map on consume and leave
//! it on ack, mirroring a consumer group's pending-entry list.
//! [`MemoryBroker::redeliver_pending`] simulates the crash-redelivery path.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use courier_core::{CourierError, QueuedEnvelope, StreamBroker, StreamEntry};

/// A deterministic in-memory [`StreamBroker`].
pub struct MemoryBroker {
    ready: Mutex<VecDeque<StreamEntry>>,
    pending: Mutex<HashMap<String, String>>,
    acked: Mutex<Vec<String>>,
    next_id: AtomicU64,
    notify: Notify,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            ready: Mutex::new(VecDeque::new()),
            pending: Mutex::new(HashMap::new()),
            acked: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            notify: Notify::new(),
        }
    }

    /// Append a raw payload, bypassing envelope encoding. Used to feed the
    /// worker poison entries.
    pub async fn inject_raw(&self, payload: &str) -> String {
        let id = self.allocate_id();
        self.ready.lock().await.push_back(StreamEntry {
            id: id.clone(),
            payload: payload.to_string(),
        });
        self.notify.notify_waiters();
        id
    }

    /// Move every unacked entry back to the front of the ready queue, as a
    /// broker would after the consumer's pending entries are reclaimed.
    pub async fn redeliver_pending(&self) {
        // Lock order matches consume_batch: ready, then pending.
        let mut ready = self.ready.lock().await;
        let mut pending = self.pending.lock().await;
        for (id, payload) in pending.drain() {
            ready.push_front(StreamEntry { id, payload });
        }
        drop(pending);
        drop(ready);
        self.notify.notify_waiters();
    }

    /// Entry ids acked so far, in ack order.
    pub async fn acked_ids(&self) -> Vec<String> {
        self.acked.lock().await.clone()
    }

    /// Number of consumed-but-unacked entries.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Number of entries not yet delivered to any consumer.
    pub async fn ready_count(&self) -> usize {
        self.ready.lock().await.len()
    }

    fn allocate_id(&self) -> String {
        format!("{}-0", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamBroker for MemoryBroker {
    async fn init(&self) -> Result<(), CourierError> {
        Ok(())
    }

    async fn enqueue(&self, envelope: &QueuedEnvelope) -> Result<String, CourierError> {
        let payload = envelope.encode()?;
        let id = self.allocate_id();
        self.ready.lock().await.push_back(StreamEntry {
            id: id.clone(),
            payload,
        });
        self.notify.notify_waiters();
        Ok(id)
    }

    async fn consume_batch(
        &self,
        _consumer: &str,
        max_count: usize,
        block: Duration,
    ) -> Result<Vec<StreamEntry>, CourierError> {
        loop {
            {
                let mut ready = self.ready.lock().await;
                if !ready.is_empty() {
                    let mut pending = self.pending.lock().await;
                    let mut batch = Vec::new();
                    while batch.len() < max_count {
                        let Some(entry) = ready.pop_front() else {
                            break;
                        };
                        pending.insert(entry.id.clone(), entry.payload.clone());
                        batch.push(entry);
                    }
                    return Ok(batch);
                }
            }

            if tokio::time::timeout(block, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(Vec::new());
            }
        }
    }

    async fn ack(&self, entry_id: &str) -> Result<(), CourierError> {
        self.pending.lock().await.remove(entry_id);
        self.acked.lock().await.push(entry_id.to_string());
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        Ok(())
    }
}
