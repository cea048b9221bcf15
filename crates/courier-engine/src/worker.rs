// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The consumer-group worker loop.
//!
//! One dispatcher task block-reads batches from the stream broker and
//! spawns a processing task per entry. Each task gates on the envelope's
//! due time, invokes the processor under a deadline, persists the terminal
//! transition, routes delivery, and acks. Cancellation observed during the
//! delay sleep returns without acking so the envelope redelivers after
//! restart.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use courier_core::{
    DurableStore, MessageProcessor, OfflineStore, QueuedEnvelope, StreamBroker, StreamEntry,
};

use crate::delivery;
use crate::registry::ConnectionRegistry;

/// Entries fetched per consume round.
pub const BATCH_SIZE: usize = 10;
/// Block timeout of one consume round.
pub const CONSUME_BLOCK: Duration = Duration::from_secs(1);
/// Back-off after a transient broker read error.
const CONSUME_RETRY_BACKOFF: Duration = Duration::from_secs(1);
/// Deadline for one processor invocation; exceeding it is a processor
/// error.
const PROCESSOR_TIMEOUT: Duration = Duration::from_secs(30);

/// The delayed-message worker. One logical instance; the consumer name
/// distinguishes fanned-out instances within the shared group.
pub struct DispatchWorker {
    broker: Arc<dyn StreamBroker>,
    store: Arc<dyn DurableStore>,
    offline: Arc<dyn OfflineStore>,
    registry: Arc<ConnectionRegistry>,
    processor: Arc<dyn MessageProcessor>,
    consumer_name: String,
}

impl DispatchWorker {
    pub fn new(
        broker: Arc<dyn StreamBroker>,
        store: Arc<dyn DurableStore>,
        offline: Arc<dyn OfflineStore>,
        registry: Arc<ConnectionRegistry>,
        processor: Arc<dyn MessageProcessor>,
        consumer_name: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            store,
            offline,
            registry,
            processor,
            consumer_name: consumer_name.into(),
        }
    }

    /// Run the consume loop until cancelled. Transient read errors back off
    /// and retry forever; the loop itself never exits on error.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(consumer = self.consumer_name.as_str(), "dispatch worker started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("dispatch worker shutting down");
                    break;
                }
                batch = self.broker.consume_batch(&self.consumer_name, BATCH_SIZE, CONSUME_BLOCK) => {
                    match batch {
                        Ok(entries) => {
                            for entry in entries {
                                let worker = self.clone();
                                let task_cancel = cancel.clone();
                                tokio::spawn(async move {
                                    worker.handle_entry(entry, task_cancel).await;
                                });
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "stream read failed, backing off");
                            tokio::select! {
                                _ = tokio::time::sleep(CONSUME_RETRY_BACKOFF) => {}
                                _ = cancel.cancelled() => break,
                            }
                        }
                    }
                }
            }
        }
    }

    /// Process one delivered entry through to ack.
    async fn handle_entry(&self, entry: StreamEntry, cancel: CancellationToken) {
        let envelope = match QueuedEnvelope::decode(&entry.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                // Poison entries cannot be retried usefully; ack to drop
                // them from the pending list.
                warn!(entry_id = entry.id.as_str(), error = %e, "dropping malformed entry");
                self.ack_entry(&entry.id).await;
                return;
            }
        };

        let now = Utc::now().timestamp();
        if envelope.process_time > now {
            let wait = Duration::from_secs((envelope.process_time - now) as u64);
            debug!(
                task_id = envelope.task_id.as_str(),
                wait_secs = wait.as_secs(),
                "waiting for due time"
            );
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => {
                    // Shutdown during the delay: leave the entry unacked so
                    // it redelivers after restart.
                    debug!(task_id = envelope.task_id.as_str(), "shutdown during delay, entry left pending");
                    return;
                }
            }
        }

        match tokio::time::timeout(PROCESSOR_TIMEOUT, self.processor.process(&envelope)).await {
            Ok(Ok(result)) => {
                if let Err(e) = self.store.complete(&envelope.task_id, &result).await {
                    // Persistence is best-effort past this point; the push
                    // may still reach the recipient and the entry must be
                    // acked either way.
                    error!(task_id = envelope.task_id.as_str(), error = %e, "completion write failed");
                }
                if let Err(e) = delivery::route_delivery(
                    &self.registry,
                    self.offline.as_ref(),
                    &envelope.task_id,
                    envelope.user_id,
                    &result,
                )
                .await
                {
                    error!(task_id = envelope.task_id.as_str(), error = %e, "delivery routing failed");
                }
            }
            Ok(Err(e)) => {
                warn!(task_id = envelope.task_id.as_str(), error = %e, "processor failed");
                self.record_failure(&envelope.task_id).await;
            }
            Err(_) => {
                warn!(
                    task_id = envelope.task_id.as_str(),
                    timeout_secs = PROCESSOR_TIMEOUT.as_secs(),
                    "processor timed out"
                );
                self.record_failure(&envelope.task_id).await;
            }
        }

        self.ack_entry(&entry.id).await;
    }

    async fn record_failure(&self, task_id: &str) {
        if let Err(e) = self.store.mark_failed(task_id).await {
            error!(task_id, error = %e, "failure write failed");
        }
    }

    async fn ack_entry(&self, entry_id: &str) {
        if let Err(e) = self.broker.ack(entry_id).await {
            error!(entry_id, error = %e, "ack failed, entry will redeliver");
        }
    }
}
