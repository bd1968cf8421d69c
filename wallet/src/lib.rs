pub mod account;
pub mod cipher;
pub mod config;
pub mod error;
pub mod wallet;

pub use account::Account;
pub use error::WalletError;
pub use wallet::Wallet;
