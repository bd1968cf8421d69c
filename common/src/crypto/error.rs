use thiserror::Error;

/// Errors that can occur while parsing crypto values from user input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid hexadecimal string format
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    /// Address has an invalid length
    #[error("Invalid address length: {len} bytes, expected: {expected} bytes")]
    InvalidAddressLength { len: usize, expected: usize },
}
