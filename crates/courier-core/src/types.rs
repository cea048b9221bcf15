// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared domain types for the courier message backend.
//!
//! These types cross the adapter trait boundaries: the durable message
//! record, the queued envelope carried by the stream broker, and the frame
//! pushed to recipients over the socket.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CourierError;

/// Lifecycle status of a [`MessageRecord`].
///
/// A record is created in `Pending` and transitions exactly once, to
/// `Completed` (processor returned a result) or `Failed` (enqueue or
/// processor failure). Terminal states are never re-opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Completed,
    Failed,
}

impl MessageStatus {
    /// The canonical lowercase string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CourierError::Internal(format!(
                "unknown message status: {other}"
            ))),
        }
    }
}

/// The durable unit of work, one row in the `messages` table.
///
/// `content` holds the request body while `Pending` and is overwritten with
/// the processed result on the `Pending -> Completed` edge, never otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Auto-increment row id.
    pub id: i64,
    /// Opaque unique task identifier (36-char UUID string).
    pub task_id: String,
    /// Recipient the message is addressed to.
    pub recipient_id: u64,
    /// Request body, or the processed result once completed.
    pub content: String,
    /// Lifecycle status.
    pub status: MessageStatus,
    /// ISO 8601 timestamp of the terminal transition. Absent while pending.
    pub processed_at: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// Soft-delete tombstone. Absent while live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

/// One page of history-listing results, newest first.
#[derive(Debug, Clone)]
pub struct MessagePage {
    /// Total matching rows across all pages.
    pub total: i64,
    /// The rows of the requested page.
    pub records: Vec<MessageRecord>,
}

/// The in-broker envelope, JSON-encoded into a single stream field.
///
/// Field names are the wire contract with the stream payload: `user_id` is
/// the recipient and `process_time` is the unix-seconds due time before
/// which the worker must not invoke the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedEnvelope {
    pub task_id: String,
    pub user_id: u64,
    pub message: String,
    pub process_time: i64,
}

impl QueuedEnvelope {
    /// Encode the envelope for the broker's `data` field.
    pub fn encode(&self) -> Result<String, CourierError> {
        serde_json::to_string(self)
            .map_err(|e| CourierError::Internal(format!("envelope encode failed: {e}")))
    }

    /// Decode an envelope from a broker payload.
    pub fn decode(raw: &str) -> Result<Self, CourierError> {
        serde_json::from_str(raw)
            .map_err(|e| CourierError::Internal(format!("envelope decode failed: {e}")))
    }
}

/// How a result frame reached the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    /// Pushed while the recipient held a live socket at processing time.
    Realtime,
    /// Recovered from the offline store on reconnect.
    Offline,
}

/// A server-initiated result frame, serialized as a UTF-8 text frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryFrame {
    pub task_id: String,
    pub result: String,
    pub kind: DeliveryKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            MessageStatus::Pending,
            MessageStatus::Completed,
            MessageStatus::Failed,
        ] {
            let parsed: MessageStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn status_rejects_unknown() {
        assert!("archived".parse::<MessageStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&MessageStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn envelope_wire_field_names() {
        let envelope = QueuedEnvelope {
            task_id: "t-1".into(),
            user_id: 7,
            message: "hello".into(),
            process_time: 1_700_000_000,
        };
        let encoded = envelope.encode().unwrap();
        assert!(encoded.contains("\"task_id\""));
        assert!(encoded.contains("\"user_id\""));
        assert!(encoded.contains("\"message\""));
        assert!(encoded.contains("\"process_time\""));

        let decoded = QueuedEnvelope::decode(&encoded).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn envelope_decode_rejects_garbage() {
        assert!(QueuedEnvelope::decode("not json").is_err());
        assert!(QueuedEnvelope::decode(r#"{"task_id": 1}"#).is_err());
    }

    #[test]
    fn delivery_frame_wire_format() {
        let frame = DeliveryFrame {
            task_id: "t-2".into(),
            result: "done".into(),
            kind: DeliveryKind::Realtime,
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"kind\":\"realtime\""));

        let offline = DeliveryFrame {
            kind: DeliveryKind::Offline,
            ..frame
        };
        let json = serde_json::to_string(&offline).unwrap();
        assert!(json.contains("\"kind\":\"offline\""));
    }
}
