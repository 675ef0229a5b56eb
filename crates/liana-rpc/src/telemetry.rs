use std::io::IsTerminal;
use std::path::Path;
use std::path::PathBuf;

use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Keeps the log writer alive and hands out the dispatcher RPC sessions
/// should trace into.
#[derive(Debug)]
pub struct TelemetryGuard {
    dispatch: Dispatch,
    _guard: Option<WorkerGuard>,
}

impl TelemetryGuard {
    fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
            _guard: None,
        }
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch.clone()
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides `default_level`;
/// `LIANA_RPC_LOG` redirects output from stderr to a file.
pub fn init_tracing(default_level: &str) -> TelemetryGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (writer, guard, ansi) = match log_file_path_from_env() {
        Some(path) => match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                (BoxMakeWriter::new(non_blocking), Some(guard), false)
            }
            Err(err) => {
                report_log_file_error(&path, &err);
                (BoxMakeWriter::new(std::io::stderr), None, stderr_is_terminal())
            }
        },
        None => (BoxMakeWriter::new(std::io::stderr), None, stderr_is_terminal()),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .finish();

    let dispatch = Dispatch::new(subscriber);
    if tracing::dispatcher::set_global_default(dispatch.clone()).is_err() {
        return TelemetryGuard::disabled();
    }

    TelemetryGuard {
        dispatch,
        _guard: guard,
    }
}

#[expect(clippy::print_stderr, reason = "tracing is not set up yet")]
fn report_log_file_error(path: &Path, err: &std::io::Error) {
    eprintln!("Warning: failed to open log file {}: {}", path.display(), err);
}

fn stderr_is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

fn log_file_path_from_env() -> Option<PathBuf> {
    std::env::var_os("LIANA_RPC_LOG")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
