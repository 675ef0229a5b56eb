use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
pub use clap_complete::Shell;

use crate::bitcoin_cli::Network;

const LONG_ABOUT: &str = r#"liana-rpc talks to a running Liana wallet daemon (lianad) over its
JSON-RPC Unix socket.

SOCKET:
    The socket is taken from --socket, then LIANA_RPC_SOCKET. Without either,
    running processes are scanned for lianad and the socket next to its
    configuration is used. With several daemons running, pick one explicitly.

OUTPUT:
    Results are printed as JSON. A failure reported by the daemon is printed
    as {"error": ...} and the command exits with status 1.

EXAMPLES:
    liana-rpc getinfo
    liana-rpc --socket ~/.liana/signet/lianad_rpc listcoins --unspent
    liana-rpc createspend --destination tb1q...=50000 --outpoint <txid>:0 --feerate 2
    liana-rpc call listconfirmed '{"start": 0, "end": 1700000000, "limit": 10}'
    liana-rpc decodepsbt --network signet cHNidP8BA..."#;

#[derive(Parser)]
#[command(name = "liana-rpc")]
#[command(author, version)]
#[command(about = "JSON-RPC client for the Liana wallet daemon")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the lianad RPC socket
    #[arg(long, global = true, env = "LIANA_RPC_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Seconds to wait for the daemon before giving up
    #[arg(long, global = true, env = "LIANA_RPC_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Print compact single-line JSON, errors included
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log RPC traffic to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show general information about the daemon
    #[command(name = "getinfo")]
    GetInfo,

    /// Stop lianad
    Stop,

    /// Get a new receiving address
    #[command(name = "getnewaddress")]
    GetNewAddress,

    /// List wallet coins
    #[command(name = "listcoins")]
    ListCoins {
        /// Only coins not yet spent
        #[arg(long, conflicts_with = "spent")]
        unspent: bool,

        /// Only coins already spent
        #[arg(long)]
        spent: bool,
    },

    /// Create a spend PSBT
    #[command(name = "createspend")]
    #[command(long_about = r#"Create a spend PSBT from wallet coins.

EXAMPLES:
    liana-rpc createspend --destination bc1q...=100000 --feerate 3
    liana-rpc createspend -d bc1q...=100000 -o 6f2b...:1 -o 9a0c...:0 --feerate 3"#)]
    CreateSpend {
        /// Output as ADDRESS=AMOUNT in sats (repeatable)
        #[arg(short, long = "destination", value_parser = parse_destination)]
        destinations: Vec<(String, u64)>,

        /// Coin to spend as TXID:VOUT (repeatable). Empty lets the daemon select coins
        #[arg(short, long = "outpoint")]
        outpoints: Vec<String>,

        /// Feerate in sat/vB
        #[arg(long)]
        feerate: u64,
    },

    /// Store or update a spend PSBT in the daemon database
    #[command(name = "updatespend")]
    UpdateSpend {
        /// Base64-encoded PSBT
        psbt: String,
    },

    /// List stored spend transactions
    #[command(name = "listspendtxs")]
    ListSpendTxs,

    /// Delete a stored spend transaction
    #[command(name = "delspendtx")]
    DelSpendTx {
        /// Transaction id (hex)
        txid: String,
    },

    /// Finalize and broadcast a stored spend transaction
    #[command(name = "broadcastspend")]
    BroadcastSpend {
        /// Transaction id (hex)
        txid: String,
    },

    /// Rescan the block chain from a date
    #[command(name = "startrescan")]
    StartRescan {
        /// UNIX timestamp to rescan from
        timestamp: i64,
    },

    /// List transactions confirmed in a time window
    #[command(name = "listconfirmed")]
    ListConfirmed {
        /// Inclusive lower bound (UNIX time), defaults to the genesis block
        #[arg(long)]
        start: Option<i64>,

        /// Inclusive upper bound (UNIX time), defaults to now
        #[arg(long)]
        end: Option<i64>,

        /// Maximum number of transactions
        #[arg(long, default_value_t = crate::client::DEFAULT_CONFIRMED_LIMIT)]
        limit: u64,
    },

    /// Retrieve transactions by txid
    #[command(name = "listtransactions")]
    ListTransactions {
        /// Transaction ids (hex)
        #[arg(required = true)]
        txids: Vec<String>,
    },

    /// Retrieve a single transaction
    #[command(name = "fetchtx")]
    FetchTx {
        /// Transaction id (hex)
        txid: String,
    },

    /// Create a recovery PSBT sweeping timelocked coins
    #[command(name = "createrecovery")]
    CreateRecovery {
        /// Address to sweep the coins to
        address: String,

        /// Feerate in sat/vB
        feerate: u64,

        /// Recovery path, by its timelock in blocks. 0 picks the first available
        #[arg(long, default_value_t = 0)]
        timelock: u32,
    },

    /// Call any RPC method
    #[command(long_about = r#"Call any RPC method with raw JSON params.

PARAMS must be a JSON object (named) or array (positional). Omitted means {}.

EXAMPLES:
    liana-rpc call getinfo
    liana-rpc call listtransactions '{"txids": ["6f2b..."]}'"#)]
    Call {
        /// Method name
        method: String,

        /// Params as JSON
        params: Option<String>,
    },

    /// List sockets of running lianad instances
    Instances,

    /// Extract the txid of a PSBT with bitcoin-cli
    #[command(name = "decodepsbt")]
    DecodePsbt {
        /// Base64-encoded PSBT
        psbt: String,

        /// Chain bitcoin-cli should use
        #[arg(long, value_enum, default_value_t = Network::Main)]
        network: Network,
    },

    /// Decode a raw transaction with bitcoin-cli
    #[command(name = "decoderawtx")]
    DecodeRawTx {
        /// Raw transaction (hex)
        rawtx: String,

        /// Print only the txid
        #[arg(long)]
        txid: bool,

        /// Chain bitcoin-cli should use
        #[arg(long, value_enum, default_value_t = Network::Main)]
        network: Network,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parses `ADDRESS=AMOUNT`.
pub fn parse_destination(s: &str) -> Result<(String, u64), String> {
    let (address, amount) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected ADDRESS=AMOUNT, got '{s}'"))?;
    if address.is_empty() {
        return Err(format!("missing address in '{s}'"));
    }
    let amount = amount
        .parse()
        .map_err(|_| format!("invalid amount '{amount}' in '{s}'"))?;
    Ok((address.to_string(), amount))
}
