// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The delayed message engine.
//!
//! Orchestrates the pipeline between the HTTP surface and the adapters:
//! ingest-side enqueue with compensation ([`MessageDispatcher`]), the
//! consumer-group worker loop ([`DispatchWorker`]), delivery routing with
//! offline fallback and reconnect drain, the live connection registry with
//! heartbeat eviction ([`ConnectionRegistry`]), and the daily retention
//! sweep ([`RetentionSweeper`]).

pub mod delivery;
pub mod dispatch;
pub mod processor;
pub mod registry;
pub mod sweeper;
pub mod worker;

pub use dispatch::{MessageDispatcher, SubmitReceipt};
pub use processor::EchoProcessor;
pub use registry::{Connection, ConnectionRegistry, OutboundFrame};
pub use sweeper::RetentionSweeper;
pub use worker::DispatchWorker;
