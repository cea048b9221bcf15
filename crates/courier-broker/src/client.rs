// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis connection bootstrap shared by the broker and the offline store.

use redis::aio::ConnectionManager;
use tracing::info;

use courier_core::CourierError;

/// Build a redis URL from address, optional password, and database index.
pub fn build_redis_url(address: &str, password: Option<&str>, db: i64) -> String {
    match password {
        Some(p) if !p.is_empty() => format!("redis://:{p}@{address}/{db}"),
        _ => format!("redis://{address}/{db}"),
    }
}

/// Connect to Redis and verify the connection with a PING.
///
/// The returned [`ConnectionManager`] is cheap to clone and reconnects on
/// its own; one handle serves both the stream broker and the offline store.
pub async fn connect(
    address: &str,
    password: Option<&str>,
    db: i64,
) -> Result<ConnectionManager, CourierError> {
    let url = build_redis_url(address, password, db);
    let client = redis::Client::open(url)
        .map_err(|e| CourierError::broker("invalid broker address", e))?;
    let mut conn = ConnectionManager::new(client)
        .await
        .map_err(|e| CourierError::broker("broker connection failed", e))?;

    let _: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(|e| CourierError::broker("broker ping failed", e))?;

    info!(address, db, "broker connected");
    Ok(conn)
}
