use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::Dispatch;

pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
/// Smallest chunk requested from the socket while accumulating a response.
pub const MIN_READ_SIZE: usize = 2048;

/// How request ids are assigned.
///
/// The daemon has only ever been driven with the constant id `0`, so
/// `Fixed(0)` is the default. `Incrementing` labels each call with the next
/// integer, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    Fixed(u64),
    Incrementing,
}

impl Default for IdPolicy {
    fn default() -> Self {
        IdPolicy::Fixed(0)
    }
}

impl IdPolicy {
    pub(crate) fn first_id(&self) -> u64 {
        match self {
            IdPolicy::Fixed(id) => *id,
            IdPolicy::Incrementing => 0,
        }
    }

    pub(crate) fn next_id(&self, current: u64) -> u64 {
        match self {
            IdPolicy::Fixed(id) => *id,
            IdPolicy::Incrementing => current.wrapping_add(1),
        }
    }
}

impl FromStr for IdPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(IdPolicy::Fixed(0)),
            "increment" | "incrementing" => Ok(IdPolicy::Incrementing),
            other => Err(format!("unknown id policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub timeout: Duration,
    pub min_read_size: usize,
    pub id_policy: IdPolicy,
    /// Where trace events of this session go. `Dispatch::none()` drops them.
    pub trace: Dispatch,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            min_read_size: MIN_READ_SIZE,
            id_policy: IdPolicy::default(),
            trace: Dispatch::none(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(
                env::var("LIANA_RPC_TIMEOUT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            id_policy: env::var("LIANA_RPC_ID_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Zero is ignored: a zero socket timeout is rejected by the OS.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    pub fn with_min_read_size(mut self, size: usize) -> Self {
        self.min_read_size = size.max(1);
        self
    }

    pub fn with_id_policy(mut self, policy: IdPolicy) -> Self {
        self.id_policy = policy;
        self
    }

    pub fn with_trace(mut self, trace: Dispatch) -> Self {
        self.trace = trace;
        self
    }
}

/// Socket path from `LIANA_RPC_SOCKET`, if set and non-empty.
pub fn socket_path_from_env() -> Option<PathBuf> {
    env::var_os("LIANA_RPC_SOCKET")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
