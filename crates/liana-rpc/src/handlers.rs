#![expect(clippy::print_stdout, reason = "CLI output is emitted here")]

use std::collections::BTreeMap;
use std::path::PathBuf;

use liana_rpc_common::Colors;
use liana_rpc_ipc::ByteChannel;
use liana_rpc_ipc::Params;
use liana_rpc_ipc::RpcOutcome;
use serde_json::Value;
use serde_json::json;

use crate::bitcoin_cli::BitcoinCli;
use crate::bitcoin_cli::CommandRunner;
use crate::client::CallResult;
use crate::client::ConfirmedWindow;
use crate::client::LianaClient;
use crate::commands::Commands;
use crate::error::Error;

pub type HandlerResult = Result<(), Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Indented JSON for people.
    Pretty,
    /// One JSON document per line for scripts.
    Compact,
}

impl OutputFormat {
    pub fn render(&self, value: &Value) -> String {
        let rendered = match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        };
        rendered.unwrap_or_else(|_| value.to_string())
    }

    pub fn print(&self, value: &Value) {
        println!("{}", self.render(value));
    }
}

pub struct HandlerContext<'a, C: ByteChannel> {
    pub client: &'a mut LianaClient<C>,
    pub format: OutputFormat,
}

impl<'a, C: ByteChannel> HandlerContext<'a, C> {
    pub fn new(client: &'a mut LianaClient<C>, format: OutputFormat) -> Self {
        Self { client, format }
    }

    /// Prints a success value, or the `{"error": ...}` document of a failure
    /// before turning it into an error for the exit status.
    fn emit(&self, outcome: RpcOutcome) -> HandlerResult {
        match outcome {
            RpcOutcome::Success(value) => {
                self.format.print(&value);
                Ok(())
            }
            RpcOutcome::Failure(err) => {
                self.format.print(&err.to_json());
                Err(Error::Remote(err))
            }
        }
    }

    fn emit_call(&self, result: CallResult) -> HandlerResult {
        self.emit(result?)
    }
}

/// Runs one of the commands that talk to lianad.
pub fn handle_daemon_command<C: ByteChannel>(
    ctx: &mut HandlerContext<C>,
    command: Commands,
) -> HandlerResult {
    match command {
        Commands::GetInfo => {
            let result = ctx.client.get_info();
            ctx.emit_call(result)
        }
        Commands::Stop => {
            let result = ctx.client.stop();
            ctx.emit_call(result)
        }
        Commands::GetNewAddress => {
            let result = ctx.client.get_new_address();
            ctx.emit_call(result)
        }
        Commands::ListCoins { unspent, spent } => handle_list_coins(ctx, unspent, spent),
        Commands::CreateSpend {
            destinations,
            outpoints,
            feerate,
        } => handle_create_spend(ctx, destinations, outpoints, feerate),
        Commands::UpdateSpend { psbt } => {
            let result = ctx.client.update_spend(&psbt);
            ctx.emit_call(result)
        }
        Commands::ListSpendTxs => {
            let result = ctx.client.list_spend_txs();
            ctx.emit_call(result)
        }
        Commands::DelSpendTx { txid } => {
            let result = ctx.client.del_spend_tx(&txid);
            ctx.emit_call(result)
        }
        Commands::BroadcastSpend { txid } => {
            let result = ctx.client.broadcast_spend(&txid);
            ctx.emit_call(result)
        }
        Commands::StartRescan { timestamp } => {
            let result = ctx.client.start_rescan(timestamp);
            ctx.emit_call(result)
        }
        Commands::ListConfirmed { start, end, limit } => {
            let result = ctx.client.list_confirmed(ConfirmedWindow { start, end, limit });
            ctx.emit_call(result)
        }
        Commands::ListTransactions { txids } => {
            let result = ctx.client.list_transactions(&txids);
            ctx.emit_call(result)
        }
        Commands::FetchTx { txid } => handle_fetch_tx(ctx, &txid),
        Commands::CreateRecovery {
            address,
            feerate,
            timelock,
        } => {
            let result = ctx.client.create_recovery(&address, feerate, timelock);
            ctx.emit_call(result)
        }
        Commands::Call { method, params } => handle_call(ctx, &method, params.as_deref()),
        Commands::Instances
        | Commands::DecodePsbt { .. }
        | Commands::DecodeRawTx { .. }
        | Commands::Completions { .. } => Err(Error::InvalidArgument(
            "command does not talk to lianad".to_string(),
        )),
    }
}

fn handle_list_coins<C: ByteChannel>(
    ctx: &mut HandlerContext<C>,
    unspent: bool,
    spent: bool,
) -> HandlerResult {
    let result = if unspent {
        ctx.client.list_unspent_coins()
    } else if spent {
        ctx.client.list_spent_coins()
    } else {
        ctx.client.list_coins()
    };
    ctx.emit_call(result)
}

fn handle_create_spend<C: ByteChannel>(
    ctx: &mut HandlerContext<C>,
    destinations: Vec<(String, u64)>,
    outpoints: Vec<String>,
    feerate: u64,
) -> HandlerResult {
    if destinations.is_empty() {
        return Err(Error::InvalidArgument(
            "at least one --destination is required".to_string(),
        ));
    }
    let mut merged: BTreeMap<String, u64> = BTreeMap::new();
    for (address, amount) in destinations {
        let total = merged.get(&address).copied().unwrap_or(0);
        let total = total
            .checked_add(amount)
            .ok_or_else(|| Error::InvalidArgument(format!("amount overflow for {address}")))?;
        merged.insert(address, total);
    }
    let result = ctx.client.create_spend(&merged, &outpoints, feerate);
    ctx.emit_call(result)
}

fn handle_fetch_tx<C: ByteChannel>(ctx: &mut HandlerContext<C>, txid: &str) -> HandlerResult {
    match ctx.client.fetch_tx(txid)? {
        RpcOutcome::Success(Some(tx)) => ctx.emit(RpcOutcome::Success(tx)),
        RpcOutcome::Success(None) => Err(Error::InvalidArgument(format!(
            "unknown transaction {txid}"
        ))),
        RpcOutcome::Failure(err) => ctx.emit(RpcOutcome::Failure(err)),
    }
}

fn handle_call<C: ByteChannel>(
    ctx: &mut HandlerContext<C>,
    method: &str,
    params: Option<&str>,
) -> HandlerResult {
    let params = match params {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw)
                .map_err(|err| Error::InvalidArgument(format!("params are not JSON: {err}")))?;
            Params::try_from(value)?
        }
        None => Params::empty(),
    };
    let result = ctx.client.call(method, params);
    ctx.emit_call(result)
}

pub fn handle_instances(sockets: &[PathBuf], format: OutputFormat) -> HandlerResult {
    match format {
        OutputFormat::Compact => format.print(&json!(sockets)),
        OutputFormat::Pretty if sockets.is_empty() => {
            println!("{}", Colors::warning("No running lianad found"));
        }
        OutputFormat::Pretty => {
            for socket in sockets {
                println!("{}", socket.display());
            }
        }
    }
    Ok(())
}

pub fn handle_decode_psbt<R: CommandRunner>(
    cli: &BitcoinCli<R>,
    psbt: &str,
    format: OutputFormat,
) -> HandlerResult {
    let txid = cli.psbt_to_txid(psbt)?;
    format.print(&json!({ "txid": txid }));
    Ok(())
}

pub fn handle_decode_rawtx<R: CommandRunner>(
    cli: &BitcoinCli<R>,
    rawtx: &str,
    txid_only: bool,
    format: OutputFormat,
) -> HandlerResult {
    if txid_only {
        let txid = cli.rawtx_to_txid(rawtx)?;
        format.print(&json!({ "txid": txid }));
    } else {
        format.print(&cli.decode_tx(rawtx)?);
    }
    Ok(())
}
