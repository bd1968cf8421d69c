mod address;
mod ed25519;
mod hash;
mod signer;

pub mod error;

pub use address::*;
pub use ed25519::*;
pub use error::CryptoError;
pub use hash::*;
pub use signer::{Signer, SignerError};

/// Public Key type used by accounts
pub type PublicKey = Ed25519PublicKey;

/// Signature type attached to transactions
pub type Signature = Ed25519Signature;

/// Key pair type held by accounts
pub type KeyPair = Ed25519KeyPair;
