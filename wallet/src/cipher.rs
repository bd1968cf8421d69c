use crate::config::KEY_SIZE;
use chacha20poly1305::{
    aead::{Aead, AeadCore, OsRng},
    Key, KeyInit, XChaCha20Poly1305, XNonce,
};
use thiserror::Error;

// Size of a XChaCha20-Poly1305 nonce
pub const NONCE_SIZE: usize = 24;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("Encrypted value is too short")]
    TooShort,
    #[error("Error while encrypting value")]
    Encryption,
    #[error("Error while decrypting value")]
    Decryption,
}

// Symmetric cipher keyed by the password derived key
// Every encrypted value is prefixed by its random nonce
pub struct Cipher {
    cipher: XChaCha20Poly1305,
}

impl Cipher {
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    pub fn encrypt_value(&self, value: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, value)
            .map_err(|_| CipherError::Encryption)?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(nonce.as_slice());
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    pub fn decrypt_value(&self, encrypted: &[u8]) -> Result<Vec<u8>, CipherError> {
        if encrypted.len() < NONCE_SIZE {
            return Err(CipherError::TooShort);
        }

        let (nonce, ciphertext) = encrypted.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Decryption)
    }
}
