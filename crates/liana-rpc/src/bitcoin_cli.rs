//! Transaction decoding through a local `bitcoin-cli`.

use std::env;
use std::fmt;
use std::io;
use std::process::Command;

use clap::ValueEnum;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

pub const DEFAULT_PROGRAM: &str = "bitcoin-cli";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Network {
    #[default]
    Main,
    Testnet,
    Regtest,
    Signet,
}

impl Network {
    /// The `bitcoin-cli` chain selection flag. Mainnet needs none.
    pub fn flag(&self) -> Option<&'static str> {
        match self {
            Network::Main => None,
            Network::Testnet => Some("-testnet"),
            Network::Regtest => Some("-regtest"),
            Network::Signet => Some("-signet"),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Main => "main",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
            Network::Signet => "signet",
        })
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot decode {kind}: {input}")]
    Decode { kind: &'static str, input: String },

    #[error("Unexpected {program} output: {reason}")]
    UnexpectedOutput { program: String, reason: String },
}

impl ToolError {
    pub fn suggestion(&self) -> &'static str {
        match self {
            ToolError::Spawn { .. } => {
                "Install Bitcoin Core or point LIANA_RPC_BITCOIN_CLI at bitcoin-cli."
            }
            ToolError::Decode { .. } => "Check the input encoding and the --network flag.",
            ToolError::UnexpectedOutput { .. } => "Check the bitcoin-cli version.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs an external program without a shell.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

pub struct BitcoinCli<R: CommandRunner = SystemRunner> {
    program: String,
    network: Network,
    runner: R,
}

impl BitcoinCli<SystemRunner> {
    /// Program from `LIANA_RPC_BITCOIN_CLI`, falling back to `bitcoin-cli`.
    pub fn from_env(network: Network) -> Self {
        let program = env::var("LIANA_RPC_BITCOIN_CLI")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROGRAM.to_string());
        Self::with_runner(program, network, SystemRunner)
    }
}

impl<R: CommandRunner> BitcoinCli<R> {
    pub fn with_runner(program: impl Into<String>, network: Network, runner: R) -> Self {
        Self {
            program: program.into(),
            network,
            runner,
        }
    }

    pub fn psbt_to_txid(&self, psbt: &str) -> Result<String, ToolError> {
        let decoded = self.decode("decodepsbt", "psbt", psbt)?;
        self.string_at(&decoded, "/tx/txid")
    }

    pub fn rawtx_to_txid(&self, rawtx: &str) -> Result<String, ToolError> {
        let decoded = self.decode_tx(rawtx)?;
        self.string_at(&decoded, "/txid")
    }

    pub fn decode_tx(&self, rawtx: &str) -> Result<Value, ToolError> {
        self.decode("decoderawtransaction", "rawtx", rawtx)
    }

    fn args(&self, method: &str, input: &str) -> Vec<String> {
        let mut args: Vec<String> = self.network.flag().map(str::to_string).into_iter().collect();
        args.push(method.to_string());
        args.push(input.to_string());
        args
    }

    fn decode(&self, method: &str, kind: &'static str, input: &str) -> Result<Value, ToolError> {
        let args = self.args(method, input);
        debug!(program = %self.program, network = %self.network, ?args, "Running bitcoin-cli");

        let output = self
            .runner
            .run(&self.program, &args)
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.success {
            warn!(
                method,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "bitcoin-cli failed"
            );
            return Err(ToolError::Decode {
                kind,
                input: input.to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|err| ToolError::UnexpectedOutput {
            program: self.program.clone(),
            reason: err.to_string(),
        })
    }

    fn string_at(&self, decoded: &Value, pointer: &str) -> Result<String, ToolError> {
        decoded
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ToolError::UnexpectedOutput {
                program: self.program.clone(),
                reason: format!("missing {pointer}"),
            })
    }
}
