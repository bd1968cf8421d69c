use serde::{Deserialize, Serialize};
use std::fmt;
use txbench_common::crypto::{
    Address, Ed25519SecretKey, Hash, KeyPair, PublicKey, Signature, Signer, SignerError,
};

use crate::{cipher::Cipher, error::WalletError};

// Unlocked account, able to sign transactions
pub struct Account {
    label: String,
    keypair: KeyPair,
}

impl Account {
    pub fn new(label: impl Into<String>, keypair: KeyPair) -> Self {
        Self {
            label: label.into(),
            keypair,
        }
    }

    // Generate a fresh account
    pub fn generate(label: impl Into<String>) -> Self {
        Self::new(label, KeyPair::generate())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    // Encrypt the secret key for storage
    pub(crate) fn to_data(&self, cipher: &Cipher) -> Result<AccountData, WalletError> {
        let secret = self.keypair.secret_key();
        let encrypted = cipher.encrypt_value(secret.as_bytes())?;

        Ok(AccountData {
            label: self.label.clone(),
            public_key: self.keypair.public_key(),
            encrypted_secret: hex::encode(encrypted),
        })
    }

    // Decrypt a stored account and check it matches its public key
    pub(crate) fn from_data(data: &AccountData, cipher: &Cipher) -> Result<Self, WalletError> {
        let encrypted = hex::decode(&data.encrypted_secret)?;
        let secret = Ed25519SecretKey::from_slice(&cipher.decrypt_value(&encrypted)?)?;
        let keypair = KeyPair::from_secret(&secret)?;

        if keypair.public_key() != data.public_key {
            return Err(WalletError::AccountMismatch(data.label.clone()));
        }

        Ok(Self::new(data.label.clone(), keypair))
    }
}

impl Signer for Account {
    fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    fn sign_hash(&self, hash: &Hash) -> Result<Signature, SignerError> {
        Ok(self.keypair.sign(hash.as_bytes()))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("label", &self.label)
            .field("address", &self.address())
            .finish()
    }
}

// Account as stored in the wallet file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountData {
    pub label: String,
    pub public_key: PublicKey,
    // Hex of nonce || ciphertext
    pub encrypted_secret: String,
}
