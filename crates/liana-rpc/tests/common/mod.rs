#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_lianad;
pub mod test_harness;

pub use mock_lianad::MockLianad;
pub use mock_lianad::MockResponse;
pub use mock_lianad::RecordedRequest;
pub use test_harness::TestHarness;

use assert_cmd::Command;

/// The CLI with every environment input that could leak from the host cleared.
pub fn liana_rpc_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("liana-rpc"));
    cmd.env_remove("LIANA_RPC_SOCKET")
        .env_remove("LIANA_RPC_TIMEOUT")
        .env_remove("LIANA_RPC_ID_MODE")
        .env_remove("LIANA_RPC_LOG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}
