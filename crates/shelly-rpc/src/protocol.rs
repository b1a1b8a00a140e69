//! JSON-RPC 2.0 protocol types.
//!
//! This module provides the request, reply and notification envelopes spoken
//! by Shelly Gen2+ devices over HTTP and WebSocket.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const INVALID_ARGUMENT: i32 = -103;
pub const DEADLINE_EXCEEDED: i32 = -104;
pub const NOT_FOUND: i32 = -105;
pub const RESOURCE_EXHAUSTED: i32 = -106;
pub const FAILED_PRECONDITION: i32 = -107;
pub const UNAVAILABLE: i32 = -108;
pub const UNAUTHORIZED: i32 = 401;

/// JSON-RPC 2.0 Request ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        RequestId::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RequestId,
    /// Caller tag the device echoes back as `dst`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            src: None,
            method: method.into(),
            params,
        }
    }

    #[must_use]
    pub fn with_source(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }
}

/// JSON-RPC 2.0 Response, as produced by a device.
///
/// The client never decodes replies into this type; it is used to build
/// replies in test doubles and in-process servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            src: None,
            dst: None,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn error(id: RequestId, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            src: None,
            dst: None,
            result: None,
            error: Some(error),
        }
    }
}

/// Keep `"result": null` distinct from a missing `result` member.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}

/// Reply envelope with the `result` payload left undecoded.
#[derive(Debug, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub result: Option<Box<RawValue>>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl RawResponse {
    /// Parse a reply envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object of the expected shape.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// The routing members of an incoming frame; everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct FrameHeader {
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default)]
    pub method: Option<String>,
}

/// JSON-RPC 2.0 Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Unsolicited frame pushed by the device over a persistent channel
/// (`NotifyStatus`, `NotifyFullStatus`, `NotifyEvent`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    /// Device timestamp carried in `params.ts`, if any.
    #[must_use]
    pub fn timestamp(&self) -> Option<f64> {
        self.params.as_ref()?.get("ts")?.as_f64()
    }
}
