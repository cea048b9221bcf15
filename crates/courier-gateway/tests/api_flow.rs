// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handler-level flows over the in-memory fakes and a temp SQLite store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::to_bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use courier_core::{DurableStore, MessageStatus, OfflineStore};
use courier_engine::{ConnectionRegistry, MessageDispatcher};
use courier_gateway::handlers::{
    self, MessagesParams, QueryResultParams, SendMessageRequest,
};
use courier_gateway::GatewayState;
use courier_storage::SqliteStore;
use courier_test_utils::{MemoryBroker, MemoryOfflineStore};

struct Fixture {
    state: GatewayState,
    store: Arc<SqliteStore>,
    broker: Arc<MemoryBroker>,
    offline: Arc<MemoryOfflineStore>,
    _dir: tempfile::TempDir,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("api.db");
    let store = Arc::new(SqliteStore::open(path.to_str().unwrap()).await.unwrap());
    let broker = Arc::new(MemoryBroker::new());
    let offline = Arc::new(MemoryOfflineStore::new());

    let state = GatewayState {
        dispatcher: Arc::new(MessageDispatcher::new(store.clone(), broker.clone(), 10)),
        store: store.clone(),
        offline: offline.clone(),
        registry: Arc::new(ConnectionRegistry::new()),
        start_time: std::time::Instant::now(),
    };

    Fixture {
        state,
        store,
        broker,
        offline,
        _dir: dir,
    }
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn send_message_accepts_and_seeds_pipeline() {
    let fx = fixture().await;

    let response = handlers::post_send_message(
        State(fx.state.clone()),
        Ok(Json(SendMessageRequest {
            recipient_id: 7,
            message: "hello".to_string(),
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let task_id = body["task_id"].as_str().unwrap();
    assert_eq!(task_id.len(), 36);
    assert_eq!(body["message"], "accepted; result in 10 seconds");

    // Durable row is pending; the envelope is on the stream.
    let record = fx.store.get(task_id).await.unwrap().unwrap();
    assert_eq!(record.status, MessageStatus::Pending);
    assert_eq!(record.content, "hello");
    assert_eq!(fx.broker.ready_count().await, 1);
}

#[tokio::test]
async fn query_result_consumes_slot_exactly_once() {
    let fx = fixture().await;
    fx.offline
        .put("task-q", 9, "the result", Duration::from_secs(3600))
        .await
        .unwrap();

    let params = || {
        Ok(Query(QueryResultParams {
            task_id: Some("task-q".to_string()),
        }))
    };

    let first = handlers::get_query_result(State(fx.state.clone()), params()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let body = json_body(first).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"], "the result");

    // Consumed on read: the second poll reports pending again.
    let second = handlers::get_query_result(State(fx.state.clone()), params()).await;
    assert_eq!(second.status(), StatusCode::OK);
    let body = json_body(second).await;
    assert_eq!(body["status"], "pending");
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn query_result_without_task_id_is_bad_request() {
    let fx = fixture().await;
    let response = handlers::get_query_result(
        State(fx.state.clone()),
        Ok(Query(QueryResultParams { task_id: None })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn messages_listing_clamps_and_filters() {
    let fx = fixture().await;
    for i in 0..3 {
        fx.store
            .insert(&format!("task-{i}"), 7, "body")
            .await
            .unwrap();
    }
    fx.store.complete("task-0", "done").await.unwrap();

    // Out-of-range paging is clamped, not rejected.
    let response = handlers::get_messages(
        State(fx.state.clone()),
        Ok(Query(MessagesParams {
            recipient_id: Some(7),
            page: Some(0),
            limit: Some(1000),
            status: None,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 100);
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);

    // Status filter narrows the result.
    let response = handlers::get_messages(
        State(fx.state.clone()),
        Ok(Query(MessagesParams {
            recipient_id: Some(7),
            page: None,
            limit: None,
            status: Some("completed".to_string()),
        })),
    )
    .await;
    let body = json_body(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["messages"][0]["task_id"], "task-0");

    // Unknown status filter is an input error.
    let response = handlers::get_messages(
        State(fx.state.clone()),
        Ok(Query(MessagesParams {
            recipient_id: Some(7),
            page: None,
            limit: None,
            status: Some("archived".to_string()),
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing recipient is an input error.
    let response = handlers::get_messages(
        State(fx.state.clone()),
        Ok(Query(MessagesParams {
            recipient_id: None,
            page: None,
            limit: None,
            status: None,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_uptime() {
    let fx = fixture().await;
    let Json(health) = handlers::get_health(State(fx.state.clone())).await;
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}
