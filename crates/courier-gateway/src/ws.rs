// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for real-time result delivery.
//!
//! Server -> Client (JSON text frames):
//! ```json
//! {"task_id":"<uuid>","result":"<text>","kind":"realtime"}
//! {"task_id":"<uuid>","result":"<text>","kind":"offline"}
//! {"kind":"keepalive"}
//! ```
//!
//! Inbound application payloads are discarded; any received frame or pong
//! extends the read deadline. Protocol pings from the heartbeat task and a
//! 30-second idle keepalive flow through the writer.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        rejection::QueryRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use courier_engine::delivery;
use courier_engine::registry::{Connection, OutboundFrame};

use crate::handlers::ErrorResponse;
use crate::server::GatewayState;

/// Per-frame write deadline; exceeding it terminates the writer.
const WRITE_DEADLINE: Duration = Duration::from_secs(10);
/// Read deadline, extended on every received frame or pong.
const READ_DEADLINE: Duration = Duration::from_secs(60);
/// Idle interval between application-level keepalive frames.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
/// The application-level keepalive frame.
const KEEPALIVE_FRAME: &str = r#"{"kind":"keepalive"}"#;

/// Query parameters for `GET /ws`.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub recipient_id: Option<u64>,
}

/// WebSocket upgrade handler.
///
/// Registers the connection, triggers the reconnect drain, and enters the
/// reader/writer loops.
pub async fn ws_handler(
    State(state): State<GatewayState>,
    params: Result<Query<WsParams>, QueryRejection>,
    ws: WebSocketUpgrade,
) -> Response {
    let recipient_id = match params {
        Ok(Query(WsParams {
            recipient_id: Some(id),
        })) => id,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "missing recipient_id parameter".to_string(),
                }),
            )
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, recipient_id))
}

/// Drive one socket: register, drain offline results, pump reader/writer,
/// unregister on any exit path.
async fn handle_socket(socket: WebSocket, state: GatewayState, recipient_id: u64) {
    let (ws_sender, ws_receiver) = socket.split();
    let (conn, outbound_rx) = state.registry.register(recipient_id);
    let cancel = conn.cancel_token().clone();

    let writer = tokio::spawn(write_loop(ws_sender, outbound_rx, cancel));

    // Push anything stored while the recipient was away onto this socket.
    {
        let offline = state.offline.clone();
        let drain_conn = conn.clone();
        tokio::spawn(async move {
            if let Err(e) = delivery::drain_offline(offline.as_ref(), &drain_conn).await {
                warn!(
                    recipient_id = drain_conn.recipient_id(),
                    error = %e,
                    "offline drain failed"
                );
            }
        });
    }

    read_loop(ws_receiver, &state, &conn).await;

    // Unregister cancels the connection token, which makes the writer send
    // Close and exit. Racing with a heartbeat eviction is harmless.
    state.registry.unregister(&conn);
    let _ = writer.await;
}

/// Consume the outbound channel, enforcing the per-frame write deadline
/// and emitting a keepalive after 30 seconds idle.
async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<OutboundFrame>,
    cancel: CancellationToken,
) {
    let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval() fires immediately; push the first keepalive out a period.
    keepalive.reset();

    loop {
        tokio::select! {
            maybe = outbound.recv() => match maybe {
                Some(OutboundFrame::Payload(text)) => {
                    if send_with_deadline(&mut sender, Message::Text(text.into())).await.is_err() {
                        break;
                    }
                    keepalive.reset();
                }
                Some(OutboundFrame::Ping) => {
                    if send_with_deadline(&mut sender, Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = keepalive.tick() => {
                if send_with_deadline(&mut sender, Message::Text(KEEPALIVE_FRAME.into())).await.is_err() {
                    break;
                }
            }
            _ = cancel.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

async fn send_with_deadline(
    sender: &mut SplitSink<WebSocket, Message>,
    message: Message,
) -> Result<(), ()> {
    match tokio::time::timeout(WRITE_DEADLINE, sender.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            debug!(error = %e, "socket write failed");
            Err(())
        }
        Err(_) => {
            warn!(
                deadline_secs = WRITE_DEADLINE.as_secs(),
                "socket write deadline exceeded"
            );
            Err(())
        }
    }
}

/// Read frames until close, error, deadline, or cancellation. Payload
/// content is discarded; this surface does not accept inbound application
/// messages.
async fn read_loop(
    mut receiver: SplitStream<WebSocket>,
    state: &GatewayState,
    conn: &Arc<Connection>,
) {
    let cancel = conn.cancel_token().clone();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = tokio::time::timeout(READ_DEADLINE, receiver.next()) => match next {
                Err(_) => {
                    debug!(
                        recipient_id = conn.recipient_id(),
                        "read deadline expired, closing socket"
                    );
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    debug!(recipient_id = conn.recipient_id(), error = %e, "socket read failed");
                    break;
                }
                Ok(Some(Ok(message))) => match message {
                    Message::Text(_) | Message::Binary(_) | Message::Pong(_) => {
                        state.registry.touch(conn);
                    }
                    Message::Close(_) => break,
                    // Client pings are answered by the protocol layer.
                    Message::Ping(_) => {}
                },
            }
        }
    }
}
