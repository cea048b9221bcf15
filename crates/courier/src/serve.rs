// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve` command implementation.
//!
//! Wires the collaborators explicitly -- durable store, Redis broker and
//! offline store, connection registry, dispatcher, worker, sweeper, and
//! the gateway server -- then runs until a shutdown signal cancels the
//! shared token. All boot failures surface as a non-zero exit.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use courier_broker::stream::DEFAULT_CONSUMER;
use courier_broker::{RedisOfflineStore, RedisStreamBroker};
use courier_config::model::CourierConfig;
use courier_config::{diagnostic, load_config, normalize_config, validate_config};
use courier_core::{CourierError, StreamBroker};
use courier_engine::{
    ConnectionRegistry, DispatchWorker, EchoProcessor, MessageDispatcher, RetentionSweeper,
};
use courier_gateway::{start_server, GatewayState, ServerConfig};
use courier_storage::SqliteStore;

use crate::shutdown;

/// Load the layered configuration, initialize tracing, and normalize and
/// validate the result.
fn load_and_prepare() -> Result<CourierConfig, CourierError> {
    let mut config = load_config().map_err(|e| CourierError::Config(e.to_string()))?;
    init_tracing(&config.server.log_level);
    normalize_config(&mut config);
    if let Err(errors) = validate_config(&config) {
        diagnostic::render_errors(&errors);
        return Err(CourierError::Config(
            "configuration validation failed".to_string(),
        ));
    }
    Ok(config)
}

/// Runs the `courier serve` command.
pub async fn run_serve() -> Result<(), CourierError> {
    let config = load_and_prepare()?;
    info!("starting courier serve");

    // Durable store.
    let store = Arc::new(SqliteStore::open(&config.storage.database_path).await?);
    info!(path = config.storage.database_path.as_str(), "durable store ready");

    // Stream broker and offline store share one Redis connection.
    let redis = courier_broker::connect(
        &config.broker.address,
        config.broker.password.as_deref(),
        config.broker.db,
    )
    .await?;
    let broker = Arc::new(RedisStreamBroker::new(redis.clone()));
    broker.init().await?;
    let offline = Arc::new(RedisOfflineStore::new(redis));

    // Connection registry with heartbeat.
    let registry = Arc::new(ConnectionRegistry::new());
    let cancel = shutdown::install_signal_handler();
    registry.clone().start_heartbeat(
        Duration::from_secs(config.heartbeat.interval_secs),
        Duration::from_secs(config.heartbeat.timeout_secs),
        cancel.clone(),
    );
    info!(
        interval_secs = config.heartbeat.interval_secs,
        timeout_secs = config.heartbeat.timeout_secs,
        "heartbeat started"
    );

    // Ingest-side dispatcher.
    let dispatcher = Arc::new(MessageDispatcher::new(
        store.clone(),
        broker.clone(),
        config.message.delay_seconds,
    ));

    // Worker loop.
    let worker = Arc::new(DispatchWorker::new(
        broker.clone(),
        store.clone(),
        offline.clone(),
        registry.clone(),
        Arc::new(EchoProcessor),
        DEFAULT_CONSUMER,
    ));
    tokio::spawn(worker.run(cancel.clone()));

    // Daily retention sweep.
    let sweeper = Arc::new(RetentionSweeper::new(
        store.clone(),
        config.message.cleanup_days,
        config.message.failed_cleanup_days,
        config.message.cleanup_schedule_hour as u32,
    ));
    tokio::spawn(sweeper.run(cancel.clone()));
    info!(
        hour = config.message.cleanup_schedule_hour,
        days = config.message.cleanup_days,
        "retention sweep scheduled"
    );

    // Gateway server runs until the token cancels.
    let state = GatewayState {
        dispatcher,
        store: store.clone(),
        offline,
        registry,
        start_time: std::time::Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    start_server(&server_config, state, cancel.clone()).await?;

    broker.shutdown().await?;
    store.close().await?;
    info!("courier serve shutdown complete");
    Ok(())
}

/// Runs the `courier doctor` command: load and validate configuration,
/// then probe the durable store and the broker.
pub async fn run_doctor_command() -> Result<(), CourierError> {
    let config = load_and_prepare()?;
    crate::doctor::run_doctor(&config).await
}

/// Runs the `courier sweep-failed` command: one manual sweep of failed
/// rows, then exit.
pub async fn run_sweep_failed() -> Result<(), CourierError> {
    let config = load_and_prepare()?;

    let store = Arc::new(SqliteStore::open(&config.storage.database_path).await?);
    let sweeper = RetentionSweeper::new(
        store.clone(),
        config.message.cleanup_days,
        config.message.failed_cleanup_days,
        config.message.cleanup_schedule_hour as u32,
    );
    sweeper.sweep_failed().await;
    store.close().await?;
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,courier={log_level},courier_broker={log_level},courier_config={log_level},\
             courier_engine={log_level},courier_gateway={log_level},courier_storage={log_level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
