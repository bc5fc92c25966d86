//! Utilities for driving a [`GatewayHandler`](gateway_bridge::GatewayHandler)
//! against scripted transports during tests.
//!
//! [`ScriptedTransport`] replays a fixed list of inbound events and records
//! every outbound message, so a test can assert on the exact message
//! sequence the adapter produced.
//!
//! ```rust
//! use gateway_bridge::{BridgeConfig, ConnectionScope, GatewayHandler, Pipeline, Response};
//! use gateway_bridge_testing::drive_body;
//!
//! # async fn example() {
//! let handler = GatewayHandler::new(
//!     BridgeConfig::default(),
//!     Pipeline::sync_fn(|_| Ok(Response::new(204))),
//! );
//! let run = drive_body(&handler, ConnectionScope::http("GET", "/"), b"", 4).await;
//! assert_eq!(run.response().map(|r| r.status), Some(204));
//! # }
//! ```

pub mod drive;
pub mod transport;

pub use drive::{CollectedResponse, DriveResult, body_events, drive, drive_body, drive_transport};
pub use transport::{Exhausted, ScriptedTransport};
