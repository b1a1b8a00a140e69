//! JSON-RPC 2.0 client for Shelly Gen2+ devices.
//!
//! This crate provides the request/reply envelopes, the pluggable transports
//! (HTTP, WebSocket, scripted mock), the [`RpcClient`] that correlates and
//! classifies replies, and typed accessors for device components.
//!
//! # Architecture
//!
//! - [`protocol`]: JSON-RPC 2.0 envelopes and well-known error codes
//! - [`transport`]: the [`Transport`] trait and its implementations
//! - [`context`]: cancellation and deadlines for every call
//! - [`client`]: request ids, reply interpretation, error classification
//! - [`helpers`]: id injection and typed unmarshalling shared by accessors
//! - [`components`]: `Switch`, `Boolean`, `Sys`, `Kvs`, `Shelly`
//! - [`config`]: client settings and named devices
//! - [`error`]: error taxonomy and `Result` alias
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shelly_rpc::{ClientConfig, RpcClient, Switch};
//!
//! # async fn example() -> shelly_rpc::Result<()> {
//! let client = Arc::new(RpcClient::http("192.168.33.1", &ClientConfig::default())?);
//! let relay = Switch::new(client.clone(), 0);
//!
//! let ctx = client.default_context();
//! let status = relay.get_status(&ctx).await?;
//! if status.output == Some(false) {
//!     relay.set(&ctx, true, None).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod components;
pub mod config;
pub mod context;
pub mod error;
pub mod helpers;
pub mod protocol;
pub mod transport;

pub use client::{RpcClient, decode_result};
pub use components::{AnyComponent, Boolean, Kvs, Shelly, Switch, Sys};
pub use config::{ClientConfig, Config, DeviceConfig, TransportKind};
pub use context::CallContext;
pub use error::{Error, ErrorKind, Result, TransportError};
pub use helpers::{
    Component, call_with_id, ensure_id, id_params, request_with_id, set_config_with_id,
    unmarshal_config, unmarshal_status,
};
pub use protocol::{Notification, RawResponse, Request, RequestId, Response, RpcError};
pub use transport::{HttpTransport, MockTransport, Reply, Transport, WsTransport};

pub use shelly_types::{ComponentKey, Nullable, RawFields, SetConfigResult};
