use thiserror::Error;

/// Unified error type for proxy-check
///
/// Only construction and argument problems are represented here. Failures that
/// happen while talking to a proxy are [`ProbeError`]s and never leave the
/// validator as an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Request building errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid proxy address: {0}")]
    InvalidProxyAddress(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for proxy-check operations
pub type Result<T> = std::result::Result<T, Error>;

/// Operational failure while probing a proxy
///
/// These are expected conditions (dead proxies, slow proxies, garbage replies) and are
/// reduced to an "unavailable" verdict by the validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("unrecognized status line: {0}")]
    Parse(String),
}
