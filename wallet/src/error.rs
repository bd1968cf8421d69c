use crate::cipher::CipherError;
use std::io;
use thiserror::Error;
use txbench_common::crypto::Ed25519Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Wallet file {0} not found")]
    NotFound(String),
    #[error("Wallet file {0} already exists")]
    AlreadyExists(String),
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Unsupported wallet file version {0}")]
    UnsupportedVersion(u8),
    #[error("Wallet has no account")]
    NoAccount,
    #[error("Invalid salt length: {0} bytes")]
    InvalidSalt(usize),
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Account {0} does not match its public key")]
    AccountMismatch(String),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    InvalidKey(#[from] Ed25519Error),
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Invalid wallet file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
