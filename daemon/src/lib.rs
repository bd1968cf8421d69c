pub mod config;
pub mod error;
pub mod ledger;
pub mod server;
pub mod txpool;

pub use server::NodeServer;
