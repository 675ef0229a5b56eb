#![expect(clippy::print_stderr, reason = "errors are reported on stderr")]

use std::time::Duration;

use clap::CommandFactory;
use clap::Parser;
use clap_complete::generate;
use serde_json::json;

use liana_rpc::BitcoinCli;
use liana_rpc::Error;
use liana_rpc::LianaClient;
use liana_rpc::SessionConfig;
use liana_rpc::commands::Cli;
use liana_rpc::commands::Commands;
use liana_rpc::discovery;
use liana_rpc::handlers;
use liana_rpc::handlers::HandlerContext;
use liana_rpc::handlers::OutputFormat;
use liana_rpc::telemetry::TelemetryGuard;
use liana_rpc::telemetry::init_tracing;
use liana_rpc_common::Colors;
use liana_rpc_common::color_init;

fn main() {
    let cli = Cli::parse();
    color_init(cli.no_color);
    let telemetry = init_tracing(if cli.verbose { "debug" } else { "warn" });
    let format = if cli.json {
        OutputFormat::Compact
    } else {
        OutputFormat::Pretty
    };

    let code = match run(cli, &telemetry, format) {
        Ok(()) => 0,
        Err(e) => {
            report(&e, format);
            e.exit_code()
        }
    };
    // Flush buffered log lines before exiting.
    drop(telemetry);
    std::process::exit(code);
}

fn report(error: &Error, format: OutputFormat) {
    // Remote failures were already printed as the command's output.
    if matches!(error, Error::Remote(_)) {
        return;
    }
    if format == OutputFormat::Compact {
        eprintln!("{}", json!({ "error": error.to_json() }));
        return;
    }
    eprintln!("{} {}", Colors::error("Error:"), error);
    if let Some(suggestion) = error.suggestion() {
        eprintln!("{} {}", Colors::dim("Suggestion:"), suggestion);
    }
    if error.is_retryable() {
        eprintln!(
            "{}",
            Colors::dim("(This error may be transient, retrying may succeed)")
        );
    }
}

fn run(cli: Cli, telemetry: &TelemetryGuard, format: OutputFormat) -> Result<(), Error> {
    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "liana-rpc", &mut std::io::stdout());
            Ok(())
        }
        Commands::Instances => handlers::handle_instances(&discovery::find_daemon_sockets(), format),
        Commands::DecodePsbt { psbt, network } => {
            handlers::handle_decode_psbt(&BitcoinCli::from_env(network), &psbt, format)
        }
        Commands::DecodeRawTx {
            rawtx,
            txid,
            network,
        } => handlers::handle_decode_rawtx(&BitcoinCli::from_env(network), &rawtx, txid, format),
        command => {
            let socket = discovery::resolve_socket(cli.socket)?;
            let mut config = SessionConfig::from_env().with_trace(telemetry.dispatch());
            if let Some(secs) = cli.timeout {
                config = config.with_timeout(Duration::from_secs(secs));
            }

            let mut client = LianaClient::connect_with(&socket, config)?;
            let mut ctx = HandlerContext::new(&mut client, format);
            let result = handlers::handle_daemon_command(&mut ctx, command);
            client.close();
            result
        }
    }
}
