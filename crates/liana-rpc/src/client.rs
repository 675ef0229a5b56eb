//! Typed wrappers over the lianad JSON-RPC methods.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use liana_rpc_common::ValueExt;
use liana_rpc_ipc::ByteChannel;
use liana_rpc_ipc::ClientError;
use liana_rpc_ipc::Params;
use liana_rpc_ipc::RpcOutcome;
use liana_rpc_ipc::RpcSession;
use liana_rpc_ipc::SessionConfig;
use liana_rpc_ipc::UnixSocketChannel;
use serde_json::Value;
use serde_json::json;
use tracing::debug;

/// Timestamp of the genesis block, the default lower bound of `listconfirmed`.
pub const GENESIS_TIMESTAMP: i64 = 1_231_006_505;
pub const DEFAULT_CONFIRMED_LIMIT: u64 = 100;

const RESCAN_ONGOING: &str =
    "There is already a rescan ongoing. Please wait for it to complete first.";

pub type CallResult<T = Value> = Result<RpcOutcome<T>, ClientError>;

/// Time window for `listconfirmed`. Missing bounds default to the genesis
/// block and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedWindow {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub limit: u64,
}

impl Default for ConfirmedWindow {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            limit: DEFAULT_CONFIRMED_LIMIT,
        }
    }
}

impl ConfirmedWindow {
    fn to_params(self) -> Value {
        json!({
            "start": self.start.unwrap_or(GENESIS_TIMESTAMP),
            "end": self.end.unwrap_or_else(|| Utc::now().timestamp()),
            "limit": self.limit,
        })
    }
}

/// Client for a running lianad.
///
/// Every wrapper issues one call and reshapes a successful result, usually by
/// pulling out a single field. A failure reported by the daemon comes back
/// unchanged as [`RpcOutcome::Failure`].
pub struct LianaClient<C: ByteChannel = UnixSocketChannel> {
    session: RpcSession<C>,
}

impl LianaClient<UnixSocketChannel> {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        Self::connect_with(path, SessionConfig::default())
    }

    pub fn connect_with(path: impl AsRef<Path>, config: SessionConfig) -> Result<Self, ClientError> {
        Ok(Self::new(RpcSession::connect_with(path, config)?))
    }
}

impl<C: ByteChannel> LianaClient<C> {
    pub fn new(session: RpcSession<C>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &RpcSession<C> {
        &self.session
    }

    /// Calls any method, for those without a dedicated wrapper.
    pub fn call(&mut self, method: &str, params: impl Into<Params>) -> CallResult {
        self.session.call(method, params)
    }

    fn call_field(&mut self, method: &str, params: Params, field: &str) -> CallResult {
        Ok(self.session.call(method, params)?.map(|v| v.field_or_self(field)))
    }

    /// For methods answering `{}` on success, reported as `{"ok": true}`.
    fn call_ack(&mut self, method: &str, params: Params) -> CallResult {
        Ok(self.session.call(method, params)?.map(|v| {
            if v.is_empty_object() {
                json!({"ok": true})
            } else {
                v
            }
        }))
    }

    pub fn get_info(&mut self) -> CallResult {
        self.session.call("getinfo", Params::empty())
    }

    pub fn stop(&mut self) -> CallResult {
        self.call_ack("stop", Params::empty())
    }

    pub fn get_new_address(&mut self) -> CallResult {
        self.call_field("getnewaddress", Params::empty(), "address")
    }

    pub fn list_coins(&mut self) -> CallResult {
        self.call_field("listcoins", Params::empty(), "coins")
    }

    /// Coins without `spend_info`.
    pub fn list_unspent_coins(&mut self) -> CallResult {
        Ok(self.list_coins()?.map(|coins| filter_coins(coins, false)))
    }

    /// Coins with `spend_info` set.
    pub fn list_spent_coins(&mut self) -> CallResult {
        Ok(self.list_coins()?.map(|coins| filter_coins(coins, true)))
    }

    /// Creates a spend PSBT. `destinations` maps addresses to amounts in
    /// sats, `outpoints` are `txid:vout` strings, `feerate` is sat/vB.
    pub fn create_spend(
        &mut self,
        destinations: &BTreeMap<String, u64>,
        outpoints: &[String],
        feerate: u64,
    ) -> CallResult {
        let params = named(json!({
            "destinations": destinations,
            "outpoints": outpoints,
            "feerate": feerate,
        }));
        self.call_field("createspend", params, "psbt")
    }

    pub fn update_spend(&mut self, psbt: &str) -> CallResult {
        self.call_ack("updatespend", named(json!({ "psbt": psbt })))
    }

    pub fn list_spend_txs(&mut self) -> CallResult {
        self.call_field("listspendtxs", Params::empty(), "spend_txs")
    }

    pub fn del_spend_tx(&mut self, txid: &str) -> CallResult {
        self.call_ack("delspendtx", named(json!({ "txid": txid })))
    }

    pub fn broadcast_spend(&mut self, txid: &str) -> CallResult {
        self.call_ack("broadcastspend", named(json!({ "txid": txid })))
    }

    /// Starts a rescan from `timestamp`. A rescan already in progress is
    /// reported as `{"rescanning": true}` rather than as a failure.
    pub fn start_rescan(&mut self, timestamp: i64) -> CallResult {
        let outcome = self
            .session
            .call("startrescan", named(json!({ "timestamp": timestamp })))?;
        match outcome {
            RpcOutcome::Failure(err) if err.message() == Some(RESCAN_ONGOING) => {
                debug!("Rescan already in progress");
                Ok(RpcOutcome::Success(json!({"rescanning": true})))
            }
            other => Ok(other),
        }
    }

    pub fn list_confirmed(&mut self, window: ConfirmedWindow) -> CallResult {
        self.call_field("listconfirmed", named(window.to_params()), "transactions")
    }

    pub fn list_transactions(&mut self, txids: &[String]) -> CallResult {
        self.call_field("listtransactions", named(json!({ "txids": txids })), "transactions")
    }

    /// Fetches one transaction. `None` when the daemon does not know it.
    pub fn fetch_tx(&mut self, txid: &str) -> CallResult<Option<Value>> {
        let outcome = self.list_transactions(&[txid.to_string()])?;
        Ok(outcome.map(|transactions| match transactions {
            Value::Array(mut txs) if !txs.is_empty() => Some(txs.swap_remove(0)),
            Value::Array(_) => None,
            other => Some(other),
        }))
    }

    /// Sweeps coins with an available recovery path to `address`. A
    /// `timelock` of 0 selects the first available path.
    pub fn create_recovery(&mut self, address: &str, feerate: u64, timelock: u32) -> CallResult {
        let params = named(json!({
            "address": address,
            "feerate": feerate,
            "timelock": timelock,
        }));
        self.call_field("createrecovery", params, "psbt")
    }

    pub fn close(&mut self) {
        self.session.close();
    }
}

fn named(value: Value) -> Params {
    match value {
        Value::Object(map) => Params::Named(map),
        _ => Params::empty(),
    }
}

fn filter_coins(coins: Value, spent: bool) -> Value {
    match coins {
        Value::Array(coins) => Value::Array(
            coins
                .into_iter()
                .filter(|coin| coin.is_null_or_missing("spend_info") != spent)
                .collect(),
        ),
        other => other,
    }
}
