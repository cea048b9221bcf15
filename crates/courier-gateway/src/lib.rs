// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP and WebSocket surface for the courier message backend.
//!
//! Routes:
//! - `POST /send-message` -- accept a message for delayed processing
//! - `GET /query-result` -- polling mirror of the live push
//! - `GET /messages` -- history listing over the durable store
//! - `GET /ws` -- socket upgrade into the connection registry
//! - `GET /health` -- liveness

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{build_router, start_server, GatewayState, ServerConfig};
