use async_trait::async_trait;
use bytes::Bytes;
use log::trace;
use std::{io, path::Path, sync::Arc};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
    sync::Mutex,
};
use txbench_common::crypto::Hash;

use crate::transport::{transaction_frame, PeerTransport, TransportError};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Error while writing transaction: {0}")]
    Io(#[from] io::Error),
}

/// Destination of signed and serialized transactions.
#[async_trait]
pub trait TransactionSink: Send + Sync {
    async fn transmit(&self, hash: &Hash, bytes: Bytes) -> Result<(), SinkError>;
}

// Broadcast every transaction to the connected peers
// No acknowledgement is awaited and nothing is retried
pub struct BroadcastSink<T: PeerTransport> {
    transport: Arc<T>,
    consensus: bool,
}

impl<T: PeerTransport> BroadcastSink<T> {
    pub fn new(transport: Arc<T>, consensus: bool) -> Self {
        Self {
            transport,
            consensus,
        }
    }
}

#[async_trait]
impl<T: PeerTransport> TransactionSink for BroadcastSink<T> {
    async fn transmit(&self, hash: &Hash, bytes: Bytes) -> Result<(), SinkError> {
        let frame = transaction_frame(bytes)?;
        self.transport.broadcast(frame, self.consensus).await?;

        if log::log_enabled!(log::Level::Trace) {
            trace!("Broadcasted transaction {}", hash);
        }
        Ok(())
    }
}

// Append `<hex hash>,<hex transaction>` lines to a file
pub struct FileSink {
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = File::create(path).await?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub async fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl TransactionSink for FileSink {
    async fn transmit(&self, hash: &Hash, bytes: Bytes) -> Result<(), SinkError> {
        let line = format!("{},{}\n", hash.to_hex(), hex::encode(&bytes));
        self.writer.lock().await.write_all(line.as_bytes()).await?;
        Ok(())
    }
}
