#![doc(html_root_url = "https://docs.rs/gateway_bridge/latest")]
//! Public API for the `gateway_bridge` library.
//!
//! This crate adapts an application pipeline to a message-based HTTP gateway
//! protocol: it receives request bodies under size and time limits, builds
//! structured requests, dispatches them to synchronous or asynchronous
//! pipelines and encodes responses back as chunked transport messages.

pub mod chunk;
pub mod config;
pub mod cookie;
pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod failure;
pub mod handler;
pub mod hooks;
pub mod message;
pub mod receiver;
pub mod request;
pub mod response;
pub mod scope;
pub mod transport;
pub mod translate;

pub use config::BridgeConfig;
pub use dispatch::{AsyncPipeline, DispatchBridge, Pipeline, SyncPipeline, UncaughtErrorHandler};
pub use error::{BodyError, HandlerError, PipelineError, RequestError, SendError};
pub use handler::GatewayHandler;
pub use hooks::LifecycleHooks;
pub use message::{InboundEvent, OutboundMessage};
pub use request::Request;
pub use response::Response;
pub use scope::ConnectionScope;
pub use transport::Transport;
