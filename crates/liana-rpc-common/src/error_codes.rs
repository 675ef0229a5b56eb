//! Error categories used for exit codes, and the code local failures carry
//! when they are rendered as JSON.
//!
//! The daemon reports its own failures with codes in the JSON-RPC server
//! range (-32000 to -32099); local errors borrow the start of that range.

// Used when a local failure is rendered in the same JSON shape as a remote one.
pub const CLIENT_ERROR: i32 = -32000;

/// Error category for programmatic handling and process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Daemon socket or external tool not found
    NotFound,
    /// Invalid input parameters
    InvalidInput,
    /// Internal or protocol-level failure
    Internal,
    /// External dependency failure (socket I/O, bitcoin-cli)
    External,
    /// Operation timed out
    Timeout,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Internal => "internal",
            ErrorCategory::External => "external",
            ErrorCategory::Timeout => "timeout",
        }
    }

    /// UNIX sysexits.h-compliant exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCategory::InvalidInput => 64, // EX_USAGE
            ErrorCategory::NotFound => 69,     // EX_UNAVAILABLE
            ErrorCategory::External => 74,     // EX_IOERR
            ErrorCategory::Internal => 74,     // EX_IOERR
            ErrorCategory::Timeout => 75,      // EX_TEMPFAIL
        }
    }
}
