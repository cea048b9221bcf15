// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the worker pipeline: consume, delay gate, process,
//! persist, route, ack. Uses the in-memory broker and offline store fakes
//! with a real temp-file SQLite durable store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use courier_core::{
    CourierError, DurableStore, MessageProcessor, MessageStatus, OfflineStore, QueuedEnvelope,
    StreamBroker,
};
use courier_engine::registry::OutboundFrame;
use courier_engine::{ConnectionRegistry, DispatchWorker, EchoProcessor};
use courier_storage::SqliteStore;
use courier_test_utils::{MemoryBroker, MemoryOfflineStore};

struct Stack {
    store: Arc<SqliteStore>,
    broker: Arc<MemoryBroker>,
    offline: Arc<MemoryOfflineStore>,
    registry: Arc<ConnectionRegistry>,
    cancel: CancellationToken,
    _dir: tempfile::TempDir,
}

impl Stack {
    async fn start(processor: Arc<dyn MessageProcessor>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.db");
        let store = Arc::new(SqliteStore::open(path.to_str().unwrap()).await.unwrap());
        let broker = Arc::new(MemoryBroker::new());
        let offline = Arc::new(MemoryOfflineStore::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let cancel = CancellationToken::new();

        let worker = Arc::new(DispatchWorker::new(
            broker.clone(),
            store.clone(),
            offline.clone(),
            registry.clone(),
            processor,
            "test:consumer:1",
        ));
        tokio::spawn(worker.run(cancel.clone()));

        Self {
            store,
            broker,
            offline,
            registry,
            cancel,
            _dir: dir,
        }
    }

    /// Seed the durable store and enqueue an envelope, as the dispatcher
    /// would, with an explicit due time.
    async fn submit_with_due(&self, task_id: &str, recipient_id: u64, due_in_secs: i64) {
        self.store.insert(task_id, recipient_id, "hello").await.unwrap();
        let envelope = QueuedEnvelope {
            task_id: task_id.to_string(),
            user_id: recipient_id,
            message: "hello".to_string(),
            process_time: Utc::now().timestamp() + due_in_secs,
        };
        self.broker.enqueue(&envelope).await.unwrap();
    }

    async fn status_of(&self, task_id: &str) -> MessageStatus {
        self.store.get(task_id).await.unwrap().unwrap().status
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Poll `condition` until it holds or `deadline` elapses.
async fn wait_until<F, Fut>(deadline: Duration, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = tokio::time::timeout(deadline, async {
        loop {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "condition not met within {deadline:?}");
}

struct FailingProcessor;

#[async_trait]
impl MessageProcessor for FailingProcessor {
    async fn process(&self, _envelope: &QueuedEnvelope) -> Result<String, CourierError> {
        Err(CourierError::Processor {
            message: "synthetic failure".into(),
        })
    }
}

#[tokio::test]
async fn due_envelope_completes_and_stores_offline() {
    let stack = Stack::start(Arc::new(EchoProcessor)).await;
    stack.submit_with_due("task-due", 9, -1).await;

    wait_until(Duration::from_secs(3), || async {
        stack.status_of("task-due").await == MessageStatus::Completed
    })
    .await;

    let record = stack.store.get("task-due").await.unwrap().unwrap();
    assert!(record.content.starts_with("processed: hello"));
    assert!(record.processed_at.is_some());

    // No live socket: the result lands in the offline store.
    wait_until(Duration::from_secs(2), || async {
        stack.offline.get("task-due").await.unwrap().is_some()
    })
    .await;

    // The entry is acked once the pipeline finishes.
    wait_until(Duration::from_secs(2), || async {
        stack.broker.pending_count().await == 0
    })
    .await;
    assert_eq!(stack.broker.acked_ids().await.len(), 1);
}

#[tokio::test]
async fn live_recipient_receives_realtime_frame() {
    let stack = Stack::start(Arc::new(EchoProcessor)).await;
    let (_conn, mut rx) = stack.registry.register(7);

    stack.submit_with_due("task-live", 7, -1).await;

    let frame = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match rx.recv().await.unwrap() {
                OutboundFrame::Payload(json) => return json,
                OutboundFrame::Ping => continue,
            }
        }
    })
    .await
    .expect("frame within deadline");

    assert!(frame.contains("\"task_id\":\"task-live\""));
    assert!(frame.contains("\"kind\":\"realtime\""));

    wait_until(Duration::from_secs(2), || async {
        stack.broker.pending_count().await == 0
    })
    .await;
    // The live path never writes an offline slot.
    assert!(stack.offline.is_empty().await);
}

#[tokio::test]
async fn delay_gate_holds_until_due_time() {
    let stack = Stack::start(Arc::new(EchoProcessor)).await;
    stack.submit_with_due("task-delayed", 9, 2).await;

    // Consumed promptly but held by the delay gate.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(stack.status_of("task-delayed").await, MessageStatus::Pending);
    assert_eq!(stack.broker.pending_count().await, 1);

    wait_until(Duration::from_secs(4), || async {
        stack.status_of("task-delayed").await == MessageStatus::Completed
    })
    .await;
}

#[tokio::test]
async fn poison_entry_is_acked_and_dropped() {
    let stack = Stack::start(Arc::new(EchoProcessor)).await;
    let id = stack.broker.inject_raw("{not valid json").await;

    wait_until(Duration::from_secs(3), || async {
        stack.broker.acked_ids().await.contains(&id)
    })
    .await;
    assert_eq!(stack.broker.pending_count().await, 0);
    assert!(stack.offline.is_empty().await);
}

#[tokio::test]
async fn processor_failure_marks_failed_and_pushes_nothing() {
    let stack = Stack::start(Arc::new(FailingProcessor)).await;
    let (_conn, mut rx) = stack.registry.register(7);
    stack.submit_with_due("task-fail", 7, -1).await;

    wait_until(Duration::from_secs(3), || async {
        stack.status_of("task-fail").await == MessageStatus::Failed
    })
    .await;

    let record = stack.store.get("task-fail").await.unwrap().unwrap();
    // The request body survives; only completion overwrites content.
    assert_eq!(record.content, "hello");
    assert!(record.processed_at.is_some());

    // Entry acked, nothing delivered anywhere.
    wait_until(Duration::from_secs(2), || async {
        stack.broker.pending_count().await == 0
    })
    .await;
    assert!(stack.offline.is_empty().await);
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::mpsc::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn redelivery_does_not_rewrite_completion() {
    let stack = Stack::start(Arc::new(EchoProcessor)).await;
    stack.submit_with_due("task-redeliver", 9, -1).await;

    wait_until(Duration::from_secs(3), || async {
        stack.status_of("task-redeliver").await == MessageStatus::Completed
    })
    .await;
    wait_until(Duration::from_secs(2), || async {
        stack.broker.pending_count().await == 0
    })
    .await;
    let first = stack.store.get("task-redeliver").await.unwrap().unwrap();

    // Replay the same envelope, as a pending-entry claim would after a
    // worker crash.
    let envelope = QueuedEnvelope {
        task_id: "task-redeliver".to_string(),
        user_id: 9,
        message: "hello".to_string(),
        process_time: Utc::now().timestamp() - 1,
    };
    stack.broker.enqueue(&envelope).await.unwrap();

    wait_until(Duration::from_secs(3), || async {
        stack.broker.acked_ids().await.len() == 2
    })
    .await;

    // The completed row is untouched by the second pass.
    let second = stack.store.get("task-redeliver").await.unwrap().unwrap();
    assert_eq!(second.content, first.content);
    assert_eq!(second.processed_at, first.processed_at);
    assert_eq!(second.status, MessageStatus::Completed);
}

#[tokio::test]
async fn shutdown_during_delay_leaves_entry_unacked() {
    let stack = Stack::start(Arc::new(EchoProcessor)).await;
    stack.submit_with_due("task-shutdown", 9, 10).await;

    // Wait for the worker to pick the entry up and park on the delay.
    wait_until(Duration::from_secs(2), || async {
        stack.broker.pending_count().await == 1
    })
    .await;

    stack.cancel.cancel();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Not acked and not completed: the entry redelivers after restart.
    assert_eq!(stack.broker.pending_count().await, 1);
    assert_eq!(stack.status_of("task-shutdown").await, MessageStatus::Pending);
    assert!(stack.broker.acked_ids().await.is_empty());
}
