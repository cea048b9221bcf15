// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live connection registry with heartbeat and zombie eviction.
//!
//! Maps recipient ids to their open sockets. Each connection owns a bounded
//! outbound channel consumed by the gateway's writer task; the registry
//! never writes to a socket directly, so no lock is ever held across I/O.
//! A background heartbeat pings every connection and evicts those whose
//! last activity is older than the timeout.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use courier_core::DeliveryFrame;

/// Capacity of each connection's outbound channel. A full buffer drops the
/// frame for that connection only.
pub const OUTBOUND_BUFFER: usize = 256;

/// A frame queued for the gateway writer task.
#[derive(Debug)]
pub enum OutboundFrame {
    /// A JSON text frame.
    Payload(String),
    /// A protocol-level ping from the heartbeat task.
    Ping,
}

/// One registered socket.
///
/// Tasks hold the connection handle and its channel ends, never the
/// registry itself; cancellation flows through the per-connection token.
pub struct Connection {
    id: Uuid,
    recipient_id: u64,
    outbound: mpsc::Sender<OutboundFrame>,
    last_active: Mutex<Instant>,
    cancel: CancellationToken,
}

impl Connection {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn recipient_id(&self) -> u64 {
        self.recipient_id
    }

    /// Token cancelled on unregistration or heartbeat eviction; the
    /// gateway's reader and writer tasks exit when it fires.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Non-blocking enqueue into this connection's outbound channel.
    /// Returns false when the buffer is full or the writer is gone.
    pub fn try_enqueue(&self, frame: OutboundFrame) -> bool {
        self.outbound.try_send(frame).is_ok()
    }

    fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}

/// Process-wide map of live connections per recipient.
pub struct ConnectionRegistry {
    connections: DashMap<u64, Vec<Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Insert a new connection for a recipient, creating its bounded
    /// outbound channel. The receiver half goes to the writer task.
    pub fn register(
        &self,
        recipient_id: u64,
    ) -> (Arc<Connection>, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let conn = Arc::new(Connection {
            id: Uuid::new_v4(),
            recipient_id,
            outbound: tx,
            last_active: Mutex::new(Instant::now()),
            cancel: CancellationToken::new(),
        });
        self.connections
            .entry(recipient_id)
            .or_default()
            .push(conn.clone());
        info!(recipient_id, connection_id = %conn.id, "connection registered");
        (conn, rx)
    }

    /// Remove a connection and cancel its tasks. Idempotent: racing with a
    /// heartbeat eviction or a concurrent disconnect is harmless.
    pub fn unregister(&self, conn: &Arc<Connection>) {
        conn.cancel.cancel();
        let mut removed = false;
        if let Some(mut entry) = self.connections.get_mut(&conn.recipient_id) {
            let before = entry.len();
            entry.retain(|c| c.id != conn.id);
            removed = entry.len() != before;
        }
        self.connections
            .remove_if(&conn.recipient_id, |_, conns| conns.is_empty());
        if removed {
            info!(
                recipient_id = conn.recipient_id,
                connection_id = %conn.id,
                "connection unregistered"
            );
        }
    }

    /// True iff the recipient holds at least one registered connection.
    pub fn is_live(&self, recipient_id: u64) -> bool {
        self.connections
            .get(&recipient_id)
            .map(|conns| !conns.is_empty())
            .unwrap_or(false)
    }

    /// Serialize the frame once and enqueue it to every connection of the
    /// recipient. Returns true if at least one connection accepted it; a
    /// full buffer drops the frame for that connection only.
    pub fn send(&self, recipient_id: u64, frame: &DeliveryFrame) -> bool {
        let Ok(json) = serde_json::to_string(frame) else {
            return false;
        };
        let Some(conns) = self.connections.get(&recipient_id) else {
            return false;
        };

        let mut delivered = false;
        for conn in conns.iter() {
            if conn.try_enqueue(OutboundFrame::Payload(json.clone())) {
                self.touch(conn);
                delivered = true;
            } else {
                warn!(
                    recipient_id,
                    connection_id = %conn.id,
                    task_id = frame.task_id.as_str(),
                    "outbound buffer full, frame dropped for this connection"
                );
            }
        }
        delivered
    }

    /// Refresh a connection's activity stamp. Called on any inbound frame,
    /// pong, or successful send.
    pub fn touch(&self, conn: &Connection) {
        if let Ok(mut last) = conn.last_active.lock() {
            *last = Instant::now();
        }
    }

    /// Total registered connections across all recipients.
    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|e| e.len()).sum()
    }

    /// Launch the heartbeat task: every `interval` ping all connections,
    /// then evict any idle for at least `timeout`.
    pub fn start_heartbeat(
        self: Arc<Self>,
        interval: Duration,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the immediate first tick.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        registry.ping_all();
                        registry.evict_idle(timeout);
                    }
                    _ = cancel.cancelled() => {
                        info!("heartbeat task shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn ping_all(&self) {
        for entry in self.connections.iter() {
            for conn in entry.iter() {
                if !conn.try_enqueue(OutboundFrame::Ping) {
                    debug!(
                        recipient_id = conn.recipient_id,
                        connection_id = %conn.id,
                        "ping dropped, outbound buffer full"
                    );
                }
            }
        }
    }

    /// Evict connections idle for at least `timeout` (boundary inclusive).
    /// Returns the evicted connections.
    fn evict_idle(&self, timeout: Duration) -> Vec<Arc<Connection>> {
        let mut idle = Vec::new();
        for entry in self.connections.iter() {
            for conn in entry.iter() {
                if conn.idle_for() >= timeout {
                    idle.push(conn.clone());
                }
            }
        }
        for conn in &idle {
            warn!(
                recipient_id = conn.recipient_id,
                connection_id = %conn.id,
                "heartbeat timeout, evicting connection"
            );
            self.unregister(conn);
        }
        idle
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
