// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default message processor.

use async_trait::async_trait;
use chrono::Utc;

use courier_core::{CourierError, MessageProcessor, QueuedEnvelope};

/// Produces a textual acknowledgement derived from the request body and the
/// wall clock. Stands in for whatever real work a deployment hangs off the
/// processor seam.
pub struct EchoProcessor;

#[async_trait]
impl MessageProcessor for EchoProcessor {
    async fn process(&self, envelope: &QueuedEnvelope) -> Result<String, CourierError> {
        Ok(format!(
            "processed: {} [at {}]",
            envelope.message,
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ))
    }
}
