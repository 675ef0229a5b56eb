//! Top-level errors of the client and CLI, with categories that map onto
//! sysexits-style exit codes.

use liana_rpc_common::ErrorCategory;
use liana_rpc_ipc::ClientError;
use liana_rpc_ipc::RemoteError;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::bitcoin_cli::ToolError;
use crate::discovery::DiscoveryError;

/// Exit status when the daemon answered with an error.
pub const EXIT_REMOTE_ERROR: i32 = 1;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The daemon reported a failure. Its payload has already been printed.
    #[error(transparent)]
    Remote(RemoteError),
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Client(err) => err.category(),
            Error::Discovery(_) => ErrorCategory::NotFound,
            Error::Tool(ToolError::Spawn { .. }) => ErrorCategory::NotFound,
            Error::Tool(ToolError::Decode { .. }) => ErrorCategory::InvalidInput,
            Error::Tool(ToolError::UnexpectedOutput { .. }) => ErrorCategory::External,
            Error::InvalidArgument(_) => ErrorCategory::InvalidInput,
            Error::Remote(_) => ErrorCategory::External,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Remote(_) => EXIT_REMOTE_ERROR,
            other => other.category().exit_code(),
        }
    }

    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Client(err) => err.suggestion(),
            Error::Discovery(err) => Some(err.suggestion()),
            Error::Tool(err) => Some(err.suggestion()),
            Error::InvalidArgument(_) => Some("Run 'liana-rpc --help' for usage."),
            Error::Remote(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Client(ClientError::Timeout | ClientError::ConnectionClosed { .. })
        )
    }

    pub fn to_json(&self) -> Value {
        match self {
            Error::Client(err) => err.to_json(),
            Error::Remote(err) => err.to_json(),
            other => {
                let mut json = json!({
                    "message": other.to_string(),
                    "category": other.category().as_str(),
                });
                if let Some(suggestion) = other.suggestion() {
                    json["suggestion"] = json!(suggestion);
                }
                json
            }
        }
    }
}
