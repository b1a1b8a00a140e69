//! RPC client for Shelly Gen2+ devices.
//!
//! [`RpcClient`] turns a method name and parameters into a JSON-RPC request
//! with a fresh id, hands it to its [`Transport`], and classifies what comes
//! back. The `result` payload is returned undecoded so callers pick the shape.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::value::RawValue;
use tracing::debug;

use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::protocol::{RawResponse, Request, RequestId};
use crate::transport::{HttpTransport, Transport, WsTransport};

/// RPC client for one device. Share it through `Arc`; calls may run
/// concurrently.
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
    source: Option<String>,
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("next_id", &self.next_id)
            .field("source", &self.source)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl RpcClient {
    #[must_use]
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Build a client over a transport the caller keeps a handle to, e.g. to
    /// subscribe to WebSocket notifications.
    #[must_use]
    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
            source: None,
            request_timeout: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Deadline used by [`default_context`](Self::default_context).
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn configured(self, config: &ClientConfig) -> Self {
        let client = self.with_source(config.source.clone());
        if config.request_timeout_ms == 0 {
            client
        } else {
            client.with_request_timeout(config.request_timeout())
        }
    }

    /// Client speaking HTTP to the device at `address`.
    ///
    /// # Errors
    ///
    /// Returns a transport error for an unusable address.
    pub fn http(address: &str, config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(address, config)?;
        Ok(Self::new(transport).configured(config))
    }

    /// Client over a persistent WebSocket to the device at `address`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the connection cannot be established.
    pub async fn websocket(ctx: &CallContext, address: &str, config: &ClientConfig) -> Result<Self> {
        let transport = WsTransport::connect(ctx, address).await?;
        Ok(Self::new(transport).configured(config))
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// A fresh context carrying the configured request timeout, if any.
    #[must_use]
    pub fn default_context(&self) -> CallContext {
        let ctx = CallContext::new();
        match self.request_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Invoke `method` and return its `result` exactly as the device sent it.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidRequest` for an empty method name
    /// - `Error::Transport` when the device could not be reached or the
    ///   context ended first
    /// - `Error::Rpc` when the device answered with an error envelope
    /// - `Error::MalformedResponse` when the reply is not a valid envelope
    pub async fn call(
        &self,
        ctx: &CallContext,
        method: &str,
        params: Option<Value>,
    ) -> Result<Box<RawValue>> {
        if method.trim().is_empty() {
            return Err(Error::InvalidRequest("empty method name".to_string()));
        }
        ctx.check()?;

        let mut request = Request::new(method, params, self.next_request_id());
        if let Some(source) = &self.source {
            request = request.with_source(source.clone());
        }

        debug!("Calling {} (id {})", method, request.id);
        let text = self.transport.call(ctx, &request).await.inspect_err(|e| {
            debug!("{} (id {}) failed in transport: {}", method, request.id, e);
        })?;

        interpret(&request, &text)
    }

    /// [`call`](Self::call) with typed parameters.
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call); `params` that fail to serialize are an
    /// `Error::InvalidRequest`.
    pub async fn call_with<P: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        method: &str,
        params: &P,
    ) -> Result<Box<RawValue>> {
        let params = serde_json::to_value(params)
            .map_err(|e| Error::InvalidRequest(format!("{method} params: {e}")))?;
        self.call(ctx, method, Some(params)).await
    }

    /// [`call`](Self::call) and decode the result into `T`.
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call), plus `Error::Decode` when the result does not
    /// fit `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        method: &str,
        params: Option<Value>,
    ) -> Result<T> {
        let raw = self.call(ctx, method, params).await?;
        decode_result(method, &raw)
    }

    /// Close the underlying transport. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if releasing the connection failed.
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await?;
        Ok(())
    }
}

/// Decode a raw `result` into `T`.
///
/// # Errors
///
/// Returns `Error::Decode` naming `method` when the payload does not fit.
pub fn decode_result<T: DeserializeOwned>(method: &str, raw: &RawValue) -> Result<T> {
    serde_json::from_str(raw.get()).map_err(|source| Error::Decode {
        method: method.to_string(),
        source,
    })
}

fn interpret(request: &Request, text: &str) -> Result<Box<RawValue>> {
    let method = &request.method;
    let response = RawResponse::parse(text)
        .map_err(|e| Error::MalformedResponse(format!("{method}: invalid envelope: {e}")))?;

    if let Some(id) = &response.id
        && *id != request.id
    {
        return Err(Error::MalformedResponse(format!(
            "{method}: reply id {id} does not match request id {}",
            request.id
        )));
    }

    match (response.result, response.error) {
        (Some(result), None) => Ok(result),
        (None, Some(error)) => {
            debug!("{} (id {}) rejected: {}", method, request.id, error);
            Err(error.into())
        }
        (Some(_), Some(_)) => Err(Error::MalformedResponse(format!(
            "{method}: reply carries both result and error"
        ))),
        (None, None) => Err(Error::MalformedResponse(format!(
            "{method}: reply carries neither result nor error"
        ))),
    }
}
