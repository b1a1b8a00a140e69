//! Pluggable delivery of one JSON-RPC request.
//!
//! A [`Transport`] sends a [`Request`] and hands back the raw reply envelope
//! text. It knows nothing about method semantics; interpreting the envelope
//! is the job of [`RpcClient`](crate::client::RpcClient).
//!
//! Shipped implementations:
//!
//! - [`HttpTransport`]: one HTTP `POST /rpc` per call
//! - [`WsTransport`]: one persistent WebSocket, replies correlated by request id
//! - [`MockTransport`]: scripted replies for tests

use async_trait::async_trait;

use crate::context::CallContext;
use crate::error::TransportError;
use crate::protocol::Request;

mod http;
mod mock;
mod ws;

pub use http::HttpTransport;
pub use mock::{MockTransport, Reply};
pub use ws::WsTransport;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and wait for its reply envelope.
    ///
    /// Implementations must return promptly with `Cancelled` or
    /// `DeadlineExceeded` once `ctx` says so, and must never retry.
    async fn call(&self, ctx: &CallContext, request: &Request) -> Result<String, TransportError>;

    /// Release the transport's resources. Idempotent; later calls fail with
    /// [`TransportError::Closed`].
    async fn close(&self) -> Result<(), TransportError>;
}

/// Build the RPC endpoint URL for a device address.
///
/// Accepts `host`, `host:port` and `scheme://host[:port][/path]`; a missing
/// path becomes `/rpc`.
pub(crate) fn endpoint_url(
    address: &str,
    default_scheme: &str,
    allowed_schemes: &[&str],
) -> Result<String, TransportError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(TransportError::InvalidAddress(address.to_string()));
    }

    let (scheme, rest) = match address.split_once("://") {
        Some((scheme, rest)) => {
            if !allowed_schemes.contains(&scheme) {
                return Err(TransportError::InvalidAddress(address.to_string()));
            }
            (scheme, rest)
        }
        None => (default_scheme, address),
    };

    let (host, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(TransportError::InvalidAddress(address.to_string()));
    }

    let path = if path.is_empty() || path == "/" {
        "/rpc"
    } else {
        path
    };

    Ok(format!("{scheme}://{host}{path}"))
}
