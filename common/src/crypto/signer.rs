use super::{Hash, PublicKey, Signature};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SignerError {
    #[error("Signing key is unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Signature primitive failed: {0}")]
    Primitive(String),
}

/// Capability to sign transaction content hashes.
///
/// Implementations must be safe to share between concurrent senders.
pub trait Signer: Send + Sync {
    /// Public key referenced by the produced signature records.
    fn public_key(&self) -> PublicKey;

    /// Sign the given content hash.
    fn sign_hash(&self, hash: &Hash) -> Result<Signature, SignerError>;
}
