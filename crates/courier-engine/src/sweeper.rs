// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily retention sweep of terminal message records.
//!
//! Sleeps until the configured local hour, then sweeps completed rows once
//! per 24-hour tick (including one immediately on first firing). Failed
//! rows have their own threshold and are swept on manual trigger. A sweep
//! that hits a database error is logged and skipped; the schedule is not
//! advanced and the next tick retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use courier_core::{DurableStore, MessageStatus};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// The scheduled retention sweeper.
pub struct RetentionSweeper {
    store: Arc<dyn DurableStore>,
    cleanup_days: i64,
    failed_cleanup_days: i64,
    schedule_hour: u32,
}

impl RetentionSweeper {
    /// `schedule_hour` is expected pre-clamped to 0..=23 by configuration
    /// normalization; out-of-range values are clamped again here.
    pub fn new(
        store: Arc<dyn DurableStore>,
        cleanup_days: i64,
        failed_cleanup_days: i64,
        schedule_hour: u32,
    ) -> Self {
        Self {
            store,
            cleanup_days,
            failed_cleanup_days,
            schedule_hour: schedule_hour.min(23),
        }
    }

    /// Run until cancelled: sleep to the next occurrence of the schedule
    /// hour, then sweep on every 24-hour tick.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let wait = duration_until_hour(Local::now(), self.schedule_hour);
        info!(
            hour = self.schedule_hour,
            first_tick_in_secs = wait.as_secs(),
            "retention sweeper scheduled"
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => return,
        }

        let mut ticker = tokio::time::interval(DAY);
        loop {
            tokio::select! {
                // The first tick fires immediately after the initial sleep.
                _ = ticker.tick() => {
                    self.sweep_completed().await;
                }
                _ = cancel.cancelled() => {
                    info!("retention sweeper shutting down");
                    break;
                }
            }
        }
    }

    /// Sweep completed rows older than `cleanup_days`.
    pub async fn sweep_completed(&self) {
        let cutoff = Utc::now() - chrono::Duration::days(self.cleanup_days);
        match self
            .store
            .delete_older_than(MessageStatus::Completed, cutoff)
            .await
        {
            Ok(deleted) => {
                info!(deleted, days = self.cleanup_days, "completed message sweep finished");
            }
            Err(e) => {
                warn!(error = %e, "completed message sweep failed, retrying next tick");
            }
        }
    }

    /// Sweep failed rows older than `failed_cleanup_days`. Manually
    /// triggered (CLI subcommand), not part of the daily schedule.
    pub async fn sweep_failed(&self) {
        let cutoff = Utc::now() - chrono::Duration::days(self.failed_cleanup_days);
        match self
            .store
            .delete_older_than(MessageStatus::Failed, cutoff)
            .await
        {
            Ok(deleted) => {
                info!(deleted, days = self.failed_cleanup_days, "failed message sweep finished");
            }
            Err(e) => {
                warn!(error = %e, "failed message sweep failed");
            }
        }
    }
}

/// Time until the next occurrence of `hour:00` local time. If today's
/// occurrence has passed (or is now), the next one is tomorrow.
pub fn duration_until_hour(now: DateTime<Local>, hour: u32) -> Duration {
    let target_time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or_default();
    let today_target = now.date_naive().and_time(target_time);
    let now_naive = now.naive_local();

    let next = if now_naive < today_target {
        today_target
    } else {
        today_target + chrono::Duration::days(1)
    };

    (next - now_naive).to_std().unwrap_or(Duration::ZERO)
}
