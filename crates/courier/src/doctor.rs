// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier doctor` command implementation.
//!
//! Runs diagnostic checks against the configured environment: the SQLite
//! durable store and the Redis broker. Exits non-zero when any check
//! fails, so it doubles as a deploy-time smoke test.

use std::time::{Duration, Instant};

use courier_broker::RedisStreamBroker;
use courier_config::model::CourierConfig;
use courier_core::CourierError;
use courier_storage::Database;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    fn symbol(&self) -> &'static str {
        match self {
            Self::Pass => "ok",
            Self::Fail => "FAIL",
        }
    }
}

/// Result of a single diagnostic check.
#[derive(Debug)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

/// Run the `courier doctor` command against a validated configuration.
pub async fn run_doctor(config: &CourierConfig) -> Result<(), CourierError> {
    let results = vec![
        check_config(config),
        check_storage(&config.storage.database_path).await,
        check_broker(config).await,
    ];

    println!();
    println!("  courier doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!(
            "  [{:>4}] {:<14} {} ({}ms)",
            result.status.symbol(),
            result.name,
            result.message,
            result.duration.as_millis()
        );
    }
    println!();

    let failed = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    if failed > 0 {
        Err(CourierError::Internal(format!("{failed} check(s) failed")))
    } else {
        println!("  all checks passed");
        Ok(())
    }
}

/// The config reaching doctor has already been normalized and validated;
/// report the effective pipeline knobs.
fn check_config(config: &CourierConfig) -> CheckResult {
    CheckResult {
        name: "configuration",
        status: CheckStatus::Pass,
        message: format!(
            "delay {}s, cleanup {}d/{}d at {:02}:00",
            config.message.delay_seconds,
            config.message.cleanup_days,
            config.message.failed_cleanup_days,
            config.message.cleanup_schedule_hour
        ),
        duration: Duration::ZERO,
    }
}

async fn check_storage(path: &str) -> CheckResult {
    let start = Instant::now();
    let outcome = async {
        let db = Database::open(path).await?;
        let rows: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row("SELECT count(*) FROM messages", [], |row| row.get(0))?;
                Ok(n)
            })
            .await
            .map_err(|e| CourierError::Storage {
                source: Box::new(e),
            })?;
        db.close().await?;
        Ok::<i64, CourierError>(rows)
    }
    .await;

    match outcome {
        Ok(rows) => CheckResult {
            name: "durable store",
            status: CheckStatus::Pass,
            message: format!("{path}: {rows} message rows"),
            duration: start.elapsed(),
        },
        Err(e) => CheckResult {
            name: "durable store",
            status: CheckStatus::Fail,
            message: e.to_string(),
            duration: start.elapsed(),
        },
    }
}

async fn check_broker(config: &CourierConfig) -> CheckResult {
    let start = Instant::now();
    let outcome = async {
        let conn = courier_broker::connect(
            &config.broker.address,
            config.broker.password.as_deref(),
            config.broker.db,
        )
        .await?;
        RedisStreamBroker::new(conn).depth().await
    }
    .await;

    match outcome {
        Ok(depth) => CheckResult {
            name: "stream broker",
            status: CheckStatus::Pass,
            message: format!("{}: {depth} queued entries", config.broker.address),
            duration: start.elapsed(),
        },
        Err(e) => CheckResult {
            name: "stream broker",
            status: CheckStatus::Fail,
            message: e.to_string(),
            duration: start.elapsed(),
        },
    }
}
