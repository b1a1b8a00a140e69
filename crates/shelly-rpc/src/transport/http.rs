//! One-shot HTTP transport: every call is a `POST /rpc`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{Transport, endpoint_url};
use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::error::TransportError;
use crate::protocol::Request;

#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    closed: AtomicBool,
}

impl HttpTransport {
    /// Build a transport for the device at `address` (`host[:port]` or an
    /// `http(s)://` URL).
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for an unusable address, or `Http` if the
    /// HTTP client cannot be built.
    pub fn new(address: &str, config: &ClientConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Self::with_client(address, client)
    }

    /// Build a transport around an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for an unusable address.
    pub fn with_client(address: &str, client: reqwest::Client) -> Result<Self, TransportError> {
        let url = endpoint_url(address, "http", &["http", "https"])?;
        Ok(Self {
            client,
            url,
            closed: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, request: &Request) -> Result<String, TransportError> {
        let response = self.client.post(&self.url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        trace!("HTTP {} <- {}: {}", status.as_u16(), self.url, body);

        // A JSON-RPC error body on a non-2xx status (401, 500) is a device
        // rejection and belongs to the client
        if status.is_success() || is_error_envelope(&body) {
            Ok(body)
        } else {
            Err(TransportError::HttpStatus {
                status: status.as_u16(),
            })
        }
    }
}

fn is_error_envelope(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .is_ok_and(|value| value.get("error").is_some_and(serde_json::Value::is_object))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, ctx: &CallContext, request: &Request) -> Result<String, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        debug!("HTTP call {} (id {}) -> {}", request.method, request.id, self.url);
        ctx.run(self.post(request)).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_from_host() {
        let transport = HttpTransport::new("10.0.0.7", &ClientConfig::default()).unwrap();
        assert_eq!(transport.url(), "http://10.0.0.7/rpc");
    }

    #[test]
    fn test_rejects_websocket_scheme() {
        let result = HttpTransport::new("ws://10.0.0.7", &ClientConfig::default());
        assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
    }

    #[test]
    fn test_error_envelope_detection() {
        assert!(is_error_envelope(
            r#"{"id":1,"error":{"code":401,"message":"unauthorized"}}"#
        ));
        assert!(!is_error_envelope(r#"{"id":1,"result":{}}"#));
        assert!(!is_error_envelope("<html>Not Found</html>"));
        assert!(!is_error_envelope(r#"{"error":"plain string"}"#));
    }

    #[tokio::test]
    async fn test_closed_transport_fails_fast() {
        let transport = HttpTransport::new("10.0.0.7", &ClientConfig::default()).unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let request = Request::new("Sys.GetStatus", None, 1.into());
        let result = transport.call(&CallContext::new(), &request).await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
