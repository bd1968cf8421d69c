use argon2::{Algorithm, Argon2, Params, Version};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

pub const PASSWORD_HASH_SIZE: usize = 32;
pub const SALT_SIZE: usize = 32;
pub const KEY_SIZE: usize = 32;

// Default wallet file path when none is specified
pub const DEFAULT_WALLET_PATH: &str = "./wallet.dat";

// Current version of the wallet file format
pub const WALLET_FILE_VERSION: u8 = 1;

// 15 MB, 16 iterations
const DEFAULT_MEMORY_COST: u32 = 15 * 1000;
const DEFAULT_ITERATIONS: u32 = 16;
const DEFAULT_PARALLELISM: u32 = 1;

lazy_static! {
    pub static ref PASSWORD_ALGORITHM: Argon2<'static> = {
        let params = Params::new(
            DEFAULT_MEMORY_COST,
            DEFAULT_ITERATIONS,
            DEFAULT_PARALLELISM,
            Some(PASSWORD_HASH_SIZE),
        )
        .unwrap_or_default();
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    };
}

// Argon2id parameters stored in the wallet file
// so a file can always be reopened even if the defaults change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    // Memory cost in KiB
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost: DEFAULT_MEMORY_COST,
            iterations: DEFAULT_ITERATIONS,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl KdfParams {
    // Cheapest parameters accepted by Argon2
    // Only meant for throwaway wallets
    pub const fn light() -> Self {
        Self {
            memory_cost: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
