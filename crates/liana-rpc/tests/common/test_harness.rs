//! Runs the CLI binary against a [`MockLianad`].

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;

use super::liana_rpc_cmd;
use super::mock_lianad::MockLianad;
use super::mock_lianad::MockResponse;
use super::mock_lianad::RecordedRequest;

pub struct TestHarness {
    daemon: MockLianad,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            daemon: MockLianad::start(),
        }
    }

    /// The CLI with `LIANA_RPC_SOCKET` pointing at the mock.
    pub fn cli(&self) -> Command {
        let mut cmd = liana_rpc_cmd();
        cmd.env("LIANA_RPC_SOCKET", self.daemon.socket_path());
        cmd
    }

    pub fn run(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.cli().args(args).assert()
    }

    /// Runs with `--json` and parses stdout.
    pub fn run_json(&self, args: &[&str]) -> (bool, Value) {
        let output = self
            .cli()
            .arg("--json")
            .args(args)
            .output()
            .expect("run liana-rpc");
        let stdout = String::from_utf8_lossy(&output.stdout);
        let json = serde_json::from_str(stdout.trim()).unwrap_or(Value::Null);
        (output.status.success(), json)
    }

    pub fn set_success_response(&self, method: &str, result: Value) {
        self.daemon.set_response(method, MockResponse::Success(result));
    }

    pub fn set_error_response(&self, method: &str, code: i64, message: &str) {
        self.daemon.set_response(
            method,
            MockResponse::Error {
                code,
                message: message.to_string(),
            },
        );
    }

    pub fn set_response(&self, method: &str, response: MockResponse) {
        self.daemon.set_response(method, response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.daemon.requests()
    }

    pub fn last_request_for(&self, method: &str) -> Option<RecordedRequest> {
        self.daemon.last_request_for(method)
    }

    pub fn socket_path(&self) -> &std::path::Path {
        self.daemon.socket_path()
    }
}
