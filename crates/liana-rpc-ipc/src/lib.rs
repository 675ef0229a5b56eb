#![deny(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Synchronous JSON-RPC 2.0 client transport for a daemon listening on a
//! Unix domain socket.
//!
//! The crate has two layers: [`UnixSocketChannel`] moves raw bytes over one
//! socket connection, and [`RpcSession`] speaks JSON-RPC on top of any
//! [`ByteChannel`].

mod channel;
pub mod config;
mod error;
mod mock_channel;
mod session;
mod types;

// Re-export error_codes from common so callers need only this crate.
pub use liana_rpc_common::error_codes;

pub use channel::ByteChannel;
pub use channel::UnixSocketChannel;
pub use config::IdPolicy;
pub use config::SessionConfig;
pub use config::socket_path_from_env;
pub use error::ClientError;
pub use error::ProtocolError;
pub use mock_channel::ScriptedChannel;
pub use session::RpcSession;
pub use session::SessionState;
pub use session::read_until_parseable;
pub use session::with_session;
pub use types::Params;
pub use types::RemoteError;
pub use types::RpcOutcome;
pub use types::RpcRequest;

pub type Result<T> = std::result::Result<T, ClientError>;
