// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery routing: live push with offline fallback, and the reconnect
//! drain.
//!
//! A successful enqueue into any per-connection buffer counts as delivery;
//! no offline fallback happens after that point, so a frame buffered into a
//! dying writer is lost rather than double-delivered.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use courier_core::{CourierError, DeliveryFrame, DeliveryKind, OfflineStore};

use crate::registry::{Connection, ConnectionRegistry, OutboundFrame};

/// TTL of offline result slots. Bounds recovery cost when a recipient
/// never reconnects; the durable store keeps the authoritative record.
pub const OFFLINE_TTL: Duration = Duration::from_secs(3600);

/// Route a processed result: push to the recipient's live connections, or
/// fall back to the offline store.
pub async fn route_delivery(
    registry: &ConnectionRegistry,
    offline: &dyn OfflineStore,
    task_id: &str,
    recipient_id: u64,
    result: &str,
) -> Result<(), CourierError> {
    if registry.is_live(recipient_id) {
        let frame = DeliveryFrame {
            task_id: task_id.to_string(),
            result: result.to_string(),
            kind: DeliveryKind::Realtime,
        };
        if registry.send(recipient_id, &frame) {
            info!(task_id, recipient_id, "result pushed to live recipient");
            return Ok(());
        }
        // The recipient disconnected (or every buffer filled) between the
        // liveness check and the send.
        warn!(task_id, recipient_id, "live push failed, storing offline");
    }

    offline
        .put(task_id, recipient_id, result, OFFLINE_TTL)
        .await?;
    info!(task_id, recipient_id, "result stored for offline pickup");
    Ok(())
}

/// Push every outstanding offline result onto a freshly registered
/// connection, deleting each slot only after its frame was accepted by the
/// outbound channel. Returns the number of drained slots.
pub async fn drain_offline(
    offline: &dyn OfflineStore,
    conn: &Arc<Connection>,
) -> Result<usize, CourierError> {
    let recipient_id = conn.recipient_id();
    let task_ids = offline.list_task_ids(recipient_id).await?;
    let mut drained = 0;

    for task_id in task_ids {
        // Stale index members (already picked up elsewhere) just miss.
        let Some(result) = offline.get(&task_id).await? else {
            continue;
        };
        let frame = DeliveryFrame {
            task_id: task_id.clone(),
            result,
            kind: DeliveryKind::Offline,
        };
        let json = serde_json::to_string(&frame)
            .map_err(|e| CourierError::Internal(format!("frame encode failed: {e}")))?;

        if conn.try_enqueue(OutboundFrame::Payload(json)) {
            offline.delete(&task_id).await?;
            drained += 1;
            info!(task_id = task_id.as_str(), recipient_id, "offline result drained");
        } else {
            // Leave the slot for the next reconnect.
            warn!(
                task_id = task_id.as_str(),
                recipient_id, "drain enqueue failed, slot kept"
            );
        }
    }
    Ok(drained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_test_utils::MemoryOfflineStore;

    #[tokio::test]
    async fn live_recipient_gets_realtime_frame_and_no_slot() {
        let registry = ConnectionRegistry::new();
        let offline = MemoryOfflineStore::new();
        let (_conn, mut rx) = registry.register(7);

        route_delivery(&registry, &offline, "t-1", 7, "result")
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            OutboundFrame::Payload(json) => {
                assert!(json.contains("\"kind\":\"realtime\""));
                assert!(json.contains("\"result\":\"result\""));
            }
            other => panic!("expected payload, got {other:?}"),
        }
        assert!(offline.is_empty().await);
    }

    #[tokio::test]
    async fn offline_recipient_gets_slot_with_bounded_ttl() {
        let registry = ConnectionRegistry::new();
        let offline = MemoryOfflineStore::new();

        route_delivery(&registry, &offline, "t-2", 9, "stored")
            .await
            .unwrap();

        assert_eq!(offline.get("t-2").await.unwrap().as_deref(), Some("stored"));
        assert!(offline.ttl_of("t-2").await.unwrap() <= Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn full_buffers_fall_through_to_offline() {
        let registry = ConnectionRegistry::new();
        let offline = MemoryOfflineStore::new();
        let (conn, _rx) = registry.register(7);
        for _ in 0..crate::registry::OUTBOUND_BUFFER {
            assert!(conn.try_enqueue(OutboundFrame::Ping));
        }

        route_delivery(&registry, &offline, "t-3", 7, "fallback")
            .await
            .unwrap();
        assert_eq!(
            offline.get("t-3").await.unwrap().as_deref(),
            Some("fallback")
        );
    }

    #[tokio::test]
    async fn drain_pushes_and_deletes_slots() {
        let registry = ConnectionRegistry::new();
        let offline = MemoryOfflineStore::new();
        offline.put("t-a", 11, "ra", OFFLINE_TTL).await.unwrap();
        offline.put("t-b", 11, "rb", OFFLINE_TTL).await.unwrap();
        offline.put("t-other", 12, "rc", OFFLINE_TTL).await.unwrap();

        let (conn, mut rx) = registry.register(11);
        let drained = drain_offline(&offline, &conn).await.unwrap();
        assert_eq!(drained, 2);

        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                OutboundFrame::Payload(json) => {
                    assert!(json.contains("\"kind\":\"offline\""));
                }
                other => panic!("expected payload, got {other:?}"),
            }
        }
        assert!(offline.get("t-a").await.unwrap().is_none());
        assert!(offline.get("t-b").await.unwrap().is_none());
        // Another recipient's slot is untouched.
        assert!(offline.get("t-other").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn drain_keeps_slot_when_enqueue_fails() {
        let registry = ConnectionRegistry::new();
        let offline = MemoryOfflineStore::new();
        offline.put("t-kept", 11, "r", OFFLINE_TTL).await.unwrap();

        let (conn, _rx) = registry.register(11);
        for _ in 0..crate::registry::OUTBOUND_BUFFER {
            assert!(conn.try_enqueue(OutboundFrame::Ping));
        }

        let drained = drain_offline(&offline, &conn).await.unwrap();
        assert_eq!(drained, 0);
        assert!(offline.get("t-kept").await.unwrap().is_some());
    }
}
