// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message record CRUD and retention operations.
//!
//! Status transitions are conditional UPDATEs guarded on the current
//! status, which makes `complete` and `mark_failed` idempotent under
//! redelivery without read-modify-write races.

use courier_core::{CourierError, MessagePage, MessageRecord, MessageStatus};
use rusqlite::params;

use crate::database::{is_unique_violation, map_tr_err, Database};

/// Timestamp format written by SQLite's strftime and compared against by
/// the retention sweep. Lexicographic order equals chronological order.
const SQLITE_NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

const RECORD_COLUMNS: &str =
    "id, task_id, recipient_id, content, status, processed_at, created_at, deleted_at";

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<MessageRecord, rusqlite::Error> {
    let status_str: String = row.get(4)?;
    let status = status_str.parse::<MessageStatus>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown status {status_str}").into(),
        )
    })?;
    Ok(MessageRecord {
        id: row.get(0)?,
        task_id: row.get(1)?,
        recipient_id: row.get::<_, i64>(2)? as u64,
        content: row.get(3)?,
        status,
        processed_at: row.get(5)?,
        created_at: row.get(6)?,
        deleted_at: row.get(7)?,
    })
}

/// Insert a new record in `pending` holding the request body.
///
/// A task id collision maps to [`CourierError::Duplicate`] so the caller
/// can retry allocation.
pub async fn insert(
    db: &Database,
    task_id: &str,
    recipient_id: u64,
    body: &str,
) -> Result<(), CourierError> {
    let task_id = task_id.to_string();
    let task_id_for_err = task_id.clone();
    let body = body.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (task_id, recipient_id, content, status)
                 VALUES (?1, ?2, ?3, 'pending')",
                params![task_id, recipient_id as i64, body],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CourierError::Duplicate {
                    task_id: task_id_for_err,
                }
            } else {
                map_tr_err(e)
            }
        })
}

/// Transition `pending -> completed`, overwriting the content with the
/// processed result and stamping `processed_at`.
///
/// Idempotent: a row already in a terminal state is left untouched and the
/// call succeeds, so a redelivered envelope can re-ack safely.
pub async fn complete(db: &Database, task_id: &str, result: &str) -> Result<(), CourierError> {
    let task_id = task_id.to_string();
    let result = result.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE messages
                     SET status = 'completed', content = ?2, processed_at = {SQLITE_NOW}
                     WHERE task_id = ?1 AND status = 'pending' AND deleted_at IS NULL"
                ),
                params![task_id, result],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Transition `pending -> failed`, stamping `processed_at`. No-op on a
/// non-pending row.
pub async fn mark_failed(db: &Database, task_id: &str) -> Result<(), CourierError> {
    let task_id = task_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE messages
                     SET status = 'failed', processed_at = {SQLITE_NOW}
                     WHERE task_id = ?1 AND status = 'pending' AND deleted_at IS NULL"
                ),
                params![task_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the live record for a task id.
pub async fn get(db: &Database, task_id: &str) -> Result<Option<MessageRecord>, CourierError> {
    let task_id = task_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM messages
                 WHERE task_id = ?1 AND deleted_at IS NULL"
            ))?;
            match stmt.query_row(params![task_id], row_to_record) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List a recipient's records newest-first with pagination and an optional
/// status filter.
///
/// `page` is clamped to >= 1 and `limit` to 1..=100.
pub async fn list_by_recipient(
    db: &Database,
    recipient_id: u64,
    page: i64,
    limit: i64,
    status: Option<MessageStatus>,
) -> Result<MessagePage, CourierError> {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);
    let offset = (page - 1) * limit;
    let status_str = status.map(|s| s.as_str().to_string());

    db.connection()
        .call(move |conn| {
            let (filter, count_sql, list_sql);
            match &status_str {
                Some(_) => {
                    filter = "recipient_id = ?1 AND status = ?2 AND deleted_at IS NULL";
                    count_sql = format!("SELECT count(*) FROM messages WHERE {filter}");
                    list_sql = format!(
                        "SELECT {RECORD_COLUMNS} FROM messages WHERE {filter}
                         ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4"
                    );
                }
                None => {
                    filter = "recipient_id = ?1 AND deleted_at IS NULL";
                    count_sql = format!("SELECT count(*) FROM messages WHERE {filter}");
                    list_sql = format!(
                        "SELECT {RECORD_COLUMNS} FROM messages WHERE {filter}
                         ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                    );
                }
            }

            let mut records = Vec::new();
            let total: i64;
            match &status_str {
                Some(s) => {
                    total = conn.query_row(
                        &count_sql,
                        params![recipient_id as i64, s],
                        |row| row.get(0),
                    )?;
                    let mut stmt = conn.prepare(&list_sql)?;
                    let rows = stmt.query_map(
                        params![recipient_id as i64, s, limit, offset],
                        row_to_record,
                    )?;
                    for row in rows {
                        records.push(row?);
                    }
                }
                None => {
                    total = conn.query_row(&count_sql, params![recipient_id as i64], |row| {
                        row.get(0)
                    })?;
                    let mut stmt = conn.prepare(&list_sql)?;
                    let rows = stmt.query_map(
                        params![recipient_id as i64, limit, offset],
                        row_to_record,
                    )?;
                    for row in rows {
                        records.push(row?);
                    }
                }
            }

            Ok(MessagePage { total, records })
        })
        .await
        .map_err(map_tr_err)
}

/// Hard-delete rows in `status` whose terminal timestamp precedes `cutoff`.
///
/// Bypasses the soft-delete tombstone. Rows without a `processed_at` (only
/// pending ones) are never touched, whatever the status argument.
pub async fn delete_older_than(
    db: &Database,
    status: MessageStatus,
    cutoff: chrono::DateTime<chrono::Utc>,
) -> Result<u64, CourierError> {
    let cutoff_str = cutoff.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM messages
                 WHERE status = ?1 AND processed_at IS NOT NULL AND processed_at < ?2",
                params![status.as_str(), cutoff_str],
            )?;
            Ok(deleted as u64)
        })
        .await
        .map_err(map_tr_err)
}
