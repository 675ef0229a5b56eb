//! Locating the RPC socket of a running lianad.

use std::ffi::OsStr;
use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

use liana_rpc_ipc::socket_path_from_env;
use sysinfo::ProcessRefreshKind;
use sysinfo::ProcessesToUpdate;
use sysinfo::System;
use sysinfo::UpdateKind;
use thiserror::Error;
use tracing::debug;

pub const DAEMON_NAME: &str = "lianad";
pub const SOCKET_NAME: &str = "lianad_rpc";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("No running instance of lianad found")]
    NoDaemon,

    #[error("Several instances of lianad are running: {}", format_paths(.0))]
    MultipleDaemons(Vec<PathBuf>),
}

impl DiscoveryError {
    pub fn suggestion(&self) -> &'static str {
        match self {
            DiscoveryError::NoDaemon => {
                "Start lianad first, or pass the socket path with --socket / LIANA_RPC_SOCKET."
            }
            DiscoveryError::MultipleDaemons(_) => {
                "Choose one socket with --socket / LIANA_RPC_SOCKET."
            }
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where a daemon started with `cmd` listens: `lianad_rpc` next to the file
/// named by its last argument (the config file, or the data directory entry).
pub fn socket_from_cmdline<S: AsRef<OsStr>>(cmd: &[S]) -> Option<PathBuf> {
    let last = Path::new(cmd.last()?.as_ref());
    let parent = last.parent()?;
    Some(parent.join(SOCKET_NAME))
}

fn is_daemon(name: &OsStr, cmd: &[OsString]) -> bool {
    if name == DAEMON_NAME {
        return true;
    }
    cmd.first()
        .and_then(|argv0| Path::new(argv0).file_name())
        .is_some_and(|file| file == DAEMON_NAME)
}

/// Socket paths of every lianad currently running, sorted and deduplicated.
pub fn find_daemon_sockets() -> Vec<PathBuf> {
    let refresh = ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always);
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh);

    let mut sockets: Vec<PathBuf> = system
        .processes()
        .values()
        .filter(|process| is_daemon(process.name(), process.cmd()))
        .filter_map(|process| {
            let socket = socket_from_cmdline(process.cmd());
            debug!(pid = %process.pid(), socket = ?socket, "Found lianad process");
            socket
        })
        .collect();
    sockets.sort();
    sockets.dedup();
    sockets
}

/// Picks the socket to connect to: an explicit path, then
/// `LIANA_RPC_SOCKET`, then the single running daemon.
pub fn resolve_socket(explicit: Option<PathBuf>) -> Result<PathBuf, DiscoveryError> {
    if let Some(path) = explicit.or_else(socket_path_from_env) {
        return Ok(path);
    }
    choose_socket(find_daemon_sockets())
}

pub fn choose_socket(mut candidates: Vec<PathBuf>) -> Result<PathBuf, DiscoveryError> {
    match candidates.len() {
        0 => Err(DiscoveryError::NoDaemon),
        1 => Ok(candidates.remove(0)),
        _ => Err(DiscoveryError::MultipleDaemons(candidates)),
    }
}
