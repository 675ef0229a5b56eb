#![deny(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Client for the Liana wallet daemon.
//!
//! [`LianaClient`] wraps the daemon's JSON-RPC methods on top of the
//! `liana-rpc-ipc` transport. [`discovery`] finds the socket of a running
//! daemon and [`bitcoin_cli`] decodes transactions with a local Bitcoin Core.

pub mod bitcoin_cli;
pub mod client;
pub mod commands;
pub mod discovery;
pub mod error;
pub mod handlers;
pub mod telemetry;

pub use bitcoin_cli::BitcoinCli;
pub use bitcoin_cli::Network;
pub use client::ConfirmedWindow;
pub use client::LianaClient;
pub use discovery::DiscoveryError;
pub use discovery::resolve_socket;
pub use error::Error;
pub use liana_rpc_ipc::ClientError;
pub use liana_rpc_ipc::Params;
pub use liana_rpc_ipc::RemoteError;
pub use liana_rpc_ipc::RpcOutcome;
pub use liana_rpc_ipc::SessionConfig;
