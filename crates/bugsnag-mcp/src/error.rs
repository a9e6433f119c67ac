//! Errors raised by the transport lifecycle.

use thiserror::Error;

/// Fatal server errors. Request-level failures never surface here; they are
/// encoded into JSON-RPC responses instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The transport could not be started (e.g. bind failure)
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
