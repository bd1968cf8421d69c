use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use argon2::{Algorithm, Argon2, Params, Version};
use log::{debug, info};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    account::{Account, AccountData},
    cipher::Cipher,
    config::{
        KdfParams, KEY_SIZE, PASSWORD_ALGORITHM, PASSWORD_HASH_SIZE, SALT_SIZE,
        WALLET_FILE_VERSION,
    },
    error::WalletError,
};

// Known plaintext encrypted with the password key
// Decrypting it proves the password before any account is touched
const PASSWORD_CHECK_VALUE: &[u8] = b"txbench-wallet-check";

// On disk representation of a wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WalletFile {
    version: u8,
    // Hex encoded KDF salt
    salt: String,
    kdf: KdfParams,
    // Hex encoded encrypted check value
    password_check: String,
    accounts: Vec<AccountData>,
}

// Derive the cipher key from the password
fn derive_key(
    password: &str,
    salt: &[u8],
    params: &KdfParams,
) -> Result<[u8; KEY_SIZE], WalletError> {
    let mut key = [0u8; PASSWORD_HASH_SIZE];
    let result = if params.is_default() {
        PASSWORD_ALGORITHM.hash_password_into(password.as_bytes(), salt, &mut key)
    } else {
        let argon2_params = Params::new(
            params.memory_cost,
            params.iterations,
            params.parallelism,
            Some(PASSWORD_HASH_SIZE),
        )
        .map_err(|e| WalletError::KeyDerivation(e.to_string()))?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params).hash_password_into(
            password.as_bytes(),
            salt,
            &mut key,
        )
    };

    result.map_err(|e| WalletError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

pub struct Wallet {
    path: PathBuf,
    accounts: Vec<Arc<Account>>,
}

impl Wallet {
    // Create a wallet file holding one freshly generated account
    pub fn create(
        path: impl AsRef<Path>,
        password: &str,
        label: &str,
    ) -> Result<Self, WalletError> {
        Self::create_with_params(path, password, label, KdfParams::default())
    }

    pub fn create_with_params(
        path: impl AsRef<Path>,
        password: &str,
        label: &str,
        kdf: KdfParams,
    ) -> Result<Self, WalletError> {
        let path = path.as_ref();
        if path.exists() {
            return Err(WalletError::AlreadyExists(path.display().to_string()));
        }

        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);

        let key = derive_key(password, &salt, &kdf)?;
        let cipher = Cipher::new(&key);

        let account = Account::generate(label);
        let file = WalletFile {
            version: WALLET_FILE_VERSION,
            salt: hex::encode(salt),
            kdf,
            password_check: hex::encode(cipher.encrypt_value(PASSWORD_CHECK_VALUE)?),
            accounts: vec![account.to_data(&cipher)?],
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_vec_pretty(&file)?)?;

        info!(
            "Created wallet {} with account {}",
            path.display(),
            account.address()
        );

        Ok(Self {
            path: path.to_path_buf(),
            accounts: vec![Arc::new(account)],
        })
    }

    // Open an existing wallet file and unlock every account in it
    pub fn open(path: impl AsRef<Path>, password: &str) -> Result<Self, WalletError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WalletError::NotFound(path.display().to_string()));
        }

        let file: WalletFile = serde_json::from_slice(&fs::read(path)?)?;
        if file.version != WALLET_FILE_VERSION {
            return Err(WalletError::UnsupportedVersion(file.version));
        }

        let salt = hex::decode(&file.salt)?;
        if salt.len() != SALT_SIZE {
            return Err(WalletError::InvalidSalt(salt.len()));
        }

        let key = derive_key(password, &salt, &file.kdf)?;
        let cipher = Cipher::new(&key);

        let check = cipher
            .decrypt_value(&hex::decode(&file.password_check)?)
            .map_err(|_| WalletError::InvalidPassword)?;
        if check != PASSWORD_CHECK_VALUE {
            return Err(WalletError::InvalidPassword);
        }

        let accounts = file
            .accounts
            .iter()
            .map(|data| Account::from_data(data, &cipher).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Opened wallet {} with {} account(s)",
            path.display(),
            accounts.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            accounts,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn accounts(&self) -> &[Arc<Account>] {
        &self.accounts
    }

    // First account of the wallet
    pub fn default_account(&self) -> Result<Arc<Account>, WalletError> {
        self.accounts.first().cloned().ok_or(WalletError::NoAccount)
    }
}
