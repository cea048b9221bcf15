// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingest-side dispatch: persist, enqueue, compensate on failure.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use courier_core::{CourierError, DurableStore, QueuedEnvelope, StreamBroker};

/// Attempts at allocating a non-colliding task id before giving up.
const ID_ALLOCATION_ATTEMPTS: u32 = 3;

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub task_id: String,
    pub delay_seconds: i64,
}

/// The enqueue path of the engine: allocates a task id, seeds the durable
/// store in `pending`, and appends the envelope to the stream broker.
///
/// This is not a two-phase commit. If the broker append fails, the record
/// is compensated to `failed`; if the compensation itself fails, the orphan
/// `pending` row is left for housekeeping and the error still surfaces to
/// the caller.
pub struct MessageDispatcher {
    store: Arc<dyn DurableStore>,
    broker: Arc<dyn StreamBroker>,
    delay_seconds: i64,
}

impl MessageDispatcher {
    /// `delay_seconds` floors to 10 when unset or non-positive.
    pub fn new(
        store: Arc<dyn DurableStore>,
        broker: Arc<dyn StreamBroker>,
        delay_seconds: i64,
    ) -> Self {
        let delay_seconds = if delay_seconds <= 0 { 10 } else { delay_seconds };
        Self {
            store,
            broker,
            delay_seconds,
        }
    }

    /// The effective delay applied to submissions.
    pub fn delay_seconds(&self) -> i64 {
        self.delay_seconds
    }

    /// Accept a message for delayed processing.
    pub async fn submit(
        &self,
        recipient_id: u64,
        body: &str,
    ) -> Result<SubmitReceipt, CourierError> {
        let task_id = self.allocate_and_insert(recipient_id, body).await?;

        let envelope = QueuedEnvelope {
            task_id: task_id.clone(),
            user_id: recipient_id,
            message: body.to_string(),
            process_time: Utc::now().timestamp() + self.delay_seconds,
        };

        if let Err(enqueue_err) = self.broker.enqueue(&envelope).await {
            // Compensation is a normal branch, not an exception handler. Its
            // own failure leaves an orphan pending row for housekeeping.
            if let Err(mark_err) = self.store.mark_failed(&task_id).await {
                error!(
                    task_id = task_id.as_str(),
                    error = %mark_err,
                    "failed to mark record failed after enqueue failure"
                );
            }
            return Err(enqueue_err);
        }

        info!(
            task_id = task_id.as_str(),
            recipient_id,
            delay_seconds = self.delay_seconds,
            "message accepted"
        );
        Ok(SubmitReceipt {
            task_id,
            delay_seconds: self.delay_seconds,
        })
    }

    async fn allocate_and_insert(
        &self,
        recipient_id: u64,
        body: &str,
    ) -> Result<String, CourierError> {
        let mut last_err = None;
        for _ in 0..ID_ALLOCATION_ATTEMPTS {
            let task_id = Uuid::new_v4().to_string();
            match self.store.insert(&task_id, recipient_id, body).await {
                Ok(()) => return Ok(task_id),
                Err(CourierError::Duplicate { .. }) => {
                    last_err = Some(CourierError::Internal(
                        "task id allocation collided".to_string(),
                    ));
                }
                Err(other) => return Err(other),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            CourierError::Internal("task id allocation failed".to_string())
        }))
    }
}
