//! Scripted in-memory transport for tests.
//!
//! Each call consumes the next queued expectation in order. The mock builds
//! the reply envelope around the request's own id, records every request it
//! sees, and reports a script mismatch as a transport error rather than
//! panicking inside the client.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::Transport;
use crate::context::CallContext;
use crate::error::TransportError;
use crate::protocol::{Request, Response, RpcError};

const MOCK_SOURCE: &str = "shellymock-000000000000";

/// What the mock answers to one call.
#[derive(Debug)]
pub enum Reply {
    /// Success envelope carrying `result`.
    Result(Value),
    /// Success envelope with `result` spliced in as raw text, byte for byte.
    RawResult(String),
    /// Error envelope.
    Error(RpcError),
    /// Entire reply text, returned unchanged.
    Envelope(String),
    /// Transport failure.
    Fail(TransportError),
    /// Never answers; the call ends only through its context.
    Never,
    /// Answer with the inner reply after a delay.
    After(Duration, Box<Reply>),
}

impl Reply {
    #[must_use]
    pub fn result(value: Value) -> Self {
        Self::Result(value)
    }

    #[must_use]
    pub fn raw_result(text: impl Into<String>) -> Self {
        Self::RawResult(text.into())
    }

    #[must_use]
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self::Error(RpcError::new(code, message))
    }

    #[must_use]
    pub fn envelope(text: impl Into<String>) -> Self {
        Self::Envelope(text.into())
    }

    #[must_use]
    pub fn fail(error: TransportError) -> Self {
        Self::Fail(error)
    }

    #[must_use]
    pub fn never() -> Self {
        Self::Never
    }

    #[must_use]
    pub fn after(delay: Duration, reply: Reply) -> Self {
        Self::After(delay, Box::new(reply))
    }
}

#[derive(Debug)]
struct Expectation {
    method: Option<String>,
    params: Option<Value>,
    reply: Reply,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Expectation>>,
    requests: Mutex<Vec<Request>>,
    closed: AtomicBool,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next call, whatever its method, with `reply`.
    pub fn push(&self, reply: Reply) -> &Self {
        self.enqueue(None, None, reply)
    }

    /// Expect the next call to be `method`.
    pub fn expect(&self, method: &str, reply: Reply) -> &Self {
        self.enqueue(Some(method.to_string()), None, reply)
    }

    /// Expect the next call to be `method` with exactly `params`.
    pub fn expect_params(&self, method: &str, params: Value, reply: Reply) -> &Self {
        self.enqueue(Some(method.to_string()), Some(params), reply)
    }

    fn enqueue(&self, method: Option<String>, params: Option<Value>, reply: Reply) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Expectation {
                method,
                params,
                reply,
            });
        self
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Expectations not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn next_expectation(&self, request: &Request) -> Result<Reply, TransportError> {
        let expectation = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| mismatch(format!("unexpected call to {}", request.method)))?;

        if let Some(method) = &expectation.method
            && *method != request.method
        {
            return Err(mismatch(format!(
                "expected {method}, got {}",
                request.method
            )));
        }
        if let Some(params) = &expectation.params
            && request.params.as_ref() != Some(params)
        {
            return Err(mismatch(format!(
                "unexpected params for {}: {:?}",
                request.method, request.params
            )));
        }

        Ok(expectation.reply)
    }
}

fn mismatch(message: String) -> TransportError {
    TransportError::Io(std::io::Error::other(message))
}

async fn answer(request: &Request, mut reply: Reply) -> Result<String, TransportError> {
    loop {
        match reply {
            Reply::After(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
            Reply::Never => std::future::pending::<()>().await,
            Reply::Result(value) => {
                let mut response = Response::success(request.id.clone(), value);
                response.src = Some(MOCK_SOURCE.to_string());
                response.dst = request.src.clone();
                return Ok(serde_json::to_string(&response)?);
            }
            Reply::RawResult(text) => {
                let id = serde_json::to_string(&request.id)?;
                return Ok(format!(
                    r#"{{"id":{id},"src":"{MOCK_SOURCE}","result":{text}}}"#
                ));
            }
            Reply::Error(error) => {
                let mut response = Response::error(request.id.clone(), error);
                response.src = Some(MOCK_SOURCE.to_string());
                response.dst = request.src.clone();
                return Ok(serde_json::to_string(&response)?);
            }
            Reply::Envelope(text) => return Ok(text),
            Reply::Fail(error) => return Err(error),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, ctx: &CallContext, request: &Request) -> Result<String, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let reply = self.next_expectation(request)?;
        ctx.run(answer(request, reply)).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(method: &str, params: Option<Value>) -> Request {
        Request::new(method, params, 11.into()).with_source("tester")
    }

    #[tokio::test]
    async fn test_result_envelope_echoes_id_and_source() {
        let mock = MockTransport::new();
        mock.expect("Sys.GetStatus", Reply::result(json!({"uptime": 5})));

        let text = mock
            .call(&CallContext::new(), &request("Sys.GetStatus", None))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["id"], 11);
        assert_eq!(value["dst"], "tester");
        assert_eq!(value["result"]["uptime"], 5);
        assert_eq!(mock.remaining(), 0);
    }

    #[tokio::test]
    async fn test_raw_result_is_spliced_verbatim() {
        let mock = MockTransport::new();
        mock.push(Reply::raw_result(r#"{ "z" : 1,"a":2 }"#));

        let text = mock
            .call(&CallContext::new(), &request("Any.Thing", None))
            .await
            .unwrap();
        assert!(text.contains(r#""result":{ "z" : 1,"a":2 }"#));
    }

    #[tokio::test]
    async fn test_method_mismatch_is_transport_error() {
        let mock = MockTransport::new();
        mock.expect("Switch.Set", Reply::result(json!({})));

        let result = mock
            .call(&CallContext::new(), &request("Switch.Toggle", None))
            .await;
        assert!(matches!(result, Err(TransportError::Io(_))));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_params_mismatch_is_transport_error() {
        let mock = MockTransport::new();
        mock.expect_params("Switch.Set", json!({"id": 0, "on": true}), Reply::result(json!({})));

        let result = mock
            .call(
                &CallContext::new(),
                &request("Switch.Set", Some(json!({"id": 0, "on": false}))),
            )
            .await;
        assert!(matches!(result, Err(TransportError::Io(_))));
    }

    #[tokio::test]
    async fn test_exhausted_script() {
        let mock = MockTransport::new();
        let result = mock
            .call(&CallContext::new(), &request("Sys.GetConfig", None))
            .await;
        assert!(matches!(result, Err(TransportError::Io(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_ends_with_deadline() {
        let mock = MockTransport::new();
        mock.push(Reply::never());

        let ctx = CallContext::new().with_timeout(Duration::from_secs(3));
        let result = mock.call(&ctx, &request("Sys.GetStatus", None)).await;
        assert!(matches!(result, Err(TransportError::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_reply() {
        let mock = MockTransport::new();
        mock.push(Reply::after(
            Duration::from_millis(200),
            Reply::error(-105, "not found"),
        ));

        let text = mock
            .call(&CallContext::new(), &request("Switch.GetStatus", None))
            .await
            .unwrap();
        assert!(text.contains("-105"));
    }

    #[tokio::test]
    async fn test_closed() {
        let mock = MockTransport::new();
        mock.push(Reply::result(json!({})));
        mock.close().await.unwrap();

        let result = mock
            .call(&CallContext::new(), &request("Sys.GetStatus", None))
            .await;
        assert!(matches!(result, Err(TransportError::Closed)));
        assert!(mock.requests().is_empty());
    }
}
