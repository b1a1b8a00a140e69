//! Error types for the shelly-rpc crate.
//!
//! Every public operation reports one of four kinds of failure, see
//! [`ErrorKind`]. Nothing in this crate retries or recovers.

use serde_json::Value;
use tokio_tungstenite::tungstenite;

use crate::protocol::RpcError;

/// Failures raised by a [`Transport`](crate::transport::Transport) before any
/// device-level interpretation of the reply was possible.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Transport closed")]
    Closed,

    #[error("Call cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl TransportError {
    /// True when the call was abandoned because its context was cancelled or
    /// its deadline passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl From<tungstenite::Error> for TransportError {
    fn from(e: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(e))
    }
}

/// Coarse classification of an [`Error`], telling the caller what to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Device unreachable for this call
    Transport,
    /// Request rejected by the firmware; retrying the same request is pointless
    Protocol,
    /// Reply could not be mapped onto the expected shape (client/firmware skew)
    Decode,
    /// Caller mistake detected before any I/O
    Request,
    /// Local config file could not be read or parsed
    Config,
}

/// Unified error type for RPC operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to decode result of {method}: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Component id mismatch: handle is {expected}, params carry {found}")]
    IdMismatch { expected: u32, found: Value },

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub fn rpc(code: i32, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Rpc { .. } => ErrorKind::Protocol,
            Self::MalformedResponse(_) | Self::Decode { .. } => ErrorKind::Decode,
            Self::InvalidRequest(_) | Self::IdMismatch { .. } => ErrorKind::Request,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// True when the call was abandoned because of cancellation or deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_cancelled())
    }

    /// Device-reported error code, for protocol errors.
    #[must_use]
    pub fn rpc_code(&self) -> Option<i32> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<RpcError> for Error {
    fn from(e: RpcError) -> Self {
        Self::Rpc {
            code: e.code,
            message: e.message,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{NOT_FOUND, RpcError};

    #[test]
    fn test_error_rpc_factory() {
        let err = Error::rpc(-103, "Invalid argument");
        match err {
            Error::Rpc { code, message } => {
                assert_eq!(code, -103);
                assert_eq!(message, "Invalid argument");
            }
            _ => panic!("Expected Rpc error"),
        }
    }

    #[test]
    fn test_error_from_rpc_error() {
        let rpc_err = RpcError::new(NOT_FOUND, "Component switch:9 not found");
        let err: Error = rpc_err.into();

        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.rpc_code(), Some(NOT_FOUND));
        assert!(err.to_string().contains("switch:9"));
    }

    #[test]
    fn test_error_from_transport_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: Error = TransportError::from(io_err).into();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("refused"));
        assert!(err.rpc_code().is_none());
    }

    #[test]
    fn test_error_kinds() {
        let json_err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let decode = Error::Decode {
            method: "Switch.GetStatus".to_string(),
            source: json_err,
        };
        assert_eq!(decode.kind(), ErrorKind::Decode);
        assert!(decode.to_string().contains("Switch.GetStatus"));

        assert_eq!(
            Error::MalformedResponse("missing result".to_string()).kind(),
            ErrorKind::Decode
        );
        assert_eq!(
            Error::InvalidRequest("empty method".to_string()).kind(),
            ErrorKind::Request
        );
        assert_eq!(
            Error::IdMismatch {
                expected: 0,
                found: Value::from(1)
            }
            .kind(),
            ErrorKind::Request
        );
    }

    #[test]
    fn test_is_cancelled() {
        assert!(Error::from(TransportError::Cancelled).is_cancelled());
        assert!(Error::from(TransportError::DeadlineExceeded).is_cancelled());
        assert!(!Error::from(TransportError::Closed).is_cancelled());
        assert!(!Error::rpc(-104, "Deadline exceeded").is_cancelled());
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(TransportError::Closed.to_string(), "Transport closed");
        assert_eq!(TransportError::Cancelled.to_string(), "Call cancelled");
        assert_eq!(
            TransportError::HttpStatus { status: 404 }.to_string(),
            "HTTP status 404"
        );
        assert!(
            TransportError::InvalidAddress(String::new())
                .to_string()
                .contains("Invalid device address")
        );
    }

    #[test]
    fn test_transport_error_from_websocket() {
        let err: TransportError = tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, TransportError::WebSocket(_)));
    }

    #[test]
    fn test_error_debug_format() {
        let err = Error::rpc(-32601, "Method not found");
        let debug_str = format!("{err:?}");
        assert!(debug_str.contains("Rpc"));
        assert!(debug_str.contains("-32601"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<i32> {
            Err(Error::Transport(TransportError::Closed))
        }

        assert!(matches!(
            returns_error(),
            Err(Error::Transport(TransportError::Closed))
        ));
    }
}
