//! Error types of the node server.

use std::io::Error as IoError;
use thiserror::Error;
use txbench_common::{network::ConnectionError, serializer::ReaderError};

#[derive(Error, Debug)]
pub enum ServerError {
    /// Listener could not be created.
    #[error("Failed to bind TCP listener on {0}: {1}")]
    BindFailed(String, IoError),

    #[error("Peer did not start with a handshake")]
    ExpectedHandshake,

    #[error("Unsupported protocol version {0}")]
    UnsupportedVersion(u16),

    #[error("Maximum number of peers reached ({0})")]
    TooManyPeers(usize),

    /// Transaction packet that does not decode.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(#[from] ReaderError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Io(#[from] IoError),
}

pub type ServerResult<T> = Result<T, ServerError>;
