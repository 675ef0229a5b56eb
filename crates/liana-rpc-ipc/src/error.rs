use std::io;
use std::path::PathBuf;

use liana_rpc_common::error_codes;
use liana_rpc_common::error_codes::ErrorCategory;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

/// Structural problems with a decoded response.
///
/// These point at a client/daemon protocol mismatch. They fail the current
/// call; the session itself may still be usable.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed response, invalid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("Malformed response, response is not an object: {0}")]
    NotAnObject(Value),

    #[error("Malformed response, id is not {expected}: {actual}")]
    MismatchedId { expected: u64, actual: Value },

    #[error("Malformed response, \"result\" missing")]
    MissingResult,
}

/// Local failures of a JSON-RPC call.
///
/// Errors reported by the daemon itself are not represented here: they come
/// back as [`RpcOutcome::Failure`](crate::RpcOutcome::Failure).
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to connect to {}: {source}", path.display())]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Not connected")]
    NotConnected,

    #[error("Connection closed by daemon ({buffered} bytes of incomplete response buffered)")]
    ConnectionClosed { buffered: usize },

    #[error("Timed out waiting for the daemon")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("Failed to serialize request: {0}")]
    SerializationFailed(#[source] serde_json::Error),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ClientError::Timeout,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => ClientError::ConnectionClosed { buffered: 0 },
            _ => ClientError::Io(err),
        }
    }
}

impl ClientError {
    /// Transport-level failure. The session must be discarded.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionFailed { .. }
                | ClientError::NotConnected
                | ClientError::ConnectionClosed { .. }
                | ClientError::Timeout
                | ClientError::Io(_)
        )
    }

    pub fn is_protocol_error(&self) -> bool {
        matches!(self, ClientError::Protocol(_))
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::ConnectionFailed { source, .. } => match source.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => {
                    ErrorCategory::NotFound
                }
                _ => ErrorCategory::External,
            },
            ClientError::Timeout => ErrorCategory::Timeout,
            ClientError::NotConnected
            | ClientError::ConnectionClosed { .. }
            | ClientError::Io(_) => ErrorCategory::External,
            ClientError::InvalidParams(_) => ErrorCategory::InvalidInput,
            ClientError::SerializationFailed(_) | ClientError::Protocol(_) => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ClientError::ConnectionFailed { .. } => {
                Some("Check that lianad is running and that the socket path is correct.")
            }
            ClientError::ConnectionClosed { .. } | ClientError::NotConnected => {
                Some("The daemon dropped the connection. Open a new session and retry.")
            }
            ClientError::Timeout => Some(
                "The daemon did not answer in time. Raise LIANA_RPC_TIMEOUT or check lianad's logs.",
            ),
            ClientError::Protocol(_) => {
                Some("The daemon answered with an unexpected message. Check the lianad version.")
            }
            _ => None,
        }
    }

    /// Renders the error in the same shape as a remote JSON-RPC error.
    pub fn to_json(&self) -> Value {
        let mut obj = json!({
            "code": error_codes::CLIENT_ERROR,
            "message": self.to_string(),
            "category": self.category().as_str(),
        });
        if let Some(suggestion) = self.suggestion() {
            obj["suggestion"] = json!(suggestion);
        }
        obj
    }
}
