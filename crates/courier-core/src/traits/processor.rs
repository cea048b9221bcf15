// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Processor trait, the injection point invoked once the delay elapses.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::QueuedEnvelope;

/// Transforms a due envelope into the result text delivered to the
/// recipient.
///
/// Redelivery may invoke the processor again for the same envelope, so
/// implementations must either be idempotent or accept that retries can
/// produce inconsistent visible results. The worker bounds each invocation
/// with a timeout and treats the timeout as a processor error.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, envelope: &QueuedEnvelope) -> Result<String, CourierError>;
}
