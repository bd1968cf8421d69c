use thiserror::Error;
use tokio::task::JoinError;

use crate::{config::ConfigError, sink::SinkError, transport::TransportError};
use txbench_common::crypto::SignerError;

#[derive(Error, Debug)]
pub enum InjectorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Signing failed, run aborted: {0}")]
    Signing(String),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Error while building transaction: {0}")]
    Build(#[from] crate::factory::FactoryError),
    #[error("Injection task failed: {0}")]
    Task(#[from] JoinError),
}
