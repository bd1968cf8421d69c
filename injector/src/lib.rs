pub mod barrier;
pub mod burst;
pub mod config;
pub mod error;
pub mod factory;
pub mod generate;
pub mod injector;
pub mod signer;
pub mod sink;
pub mod stats;
pub mod throttle;
pub mod transport;
pub mod worker;

pub use error::InjectorError;
pub use injector::Injector;
