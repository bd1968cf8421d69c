use bytes::Bytes;
use log::{debug, error, info, trace, warn};
use std::sync::{atomic::Ordering, Arc};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use txbench_common::{
    crypto::{Address, Signer, SignerError},
    serializer::Serializer,
};

use crate::{
    barrier::CompletionBarrier,
    factory::{FactoryError, TransactionFactory},
    signer::sign_transaction,
    sink::{SinkError, TransactionSink},
    stats::RunStats,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkUnit {
    // Build, sign and transmit one transaction
    Send,
    // Terminate the worker receiving it
    Stop,
}

// Receiving side of the work queue, shared by every worker
pub type WorkQueue = Arc<Mutex<mpsc::Receiver<WorkUnit>>>;

#[derive(Error, Debug)]
enum SendError {
    #[error(transparent)]
    Build(#[from] FactoryError),
    #[error(transparent)]
    Signing(#[from] SignerError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("Run aborted")]
    Aborted,
}

pub struct Worker {
    id: usize,
    queue: WorkQueue,
    factory: Arc<TransactionFactory>,
    signer: Arc<dyn Signer>,
    sink: Arc<dyn TransactionSink>,
    destination: Address,
    stats: Arc<RunStats>,
    barrier: Arc<CompletionBarrier>,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        queue: WorkQueue,
        factory: Arc<TransactionFactory>,
        signer: Arc<dyn Signer>,
        sink: Arc<dyn TransactionSink>,
        destination: Address,
        stats: Arc<RunStats>,
        barrier: Arc<CompletionBarrier>,
    ) -> Self {
        Self {
            id,
            queue,
            factory,
            signer,
            sink,
            destination,
            stats,
            barrier,
        }
    }

    pub async fn run(self) {
        debug!("Worker #{} started", self.id);
        loop {
            // The lock is only held while waiting for the next unit
            let unit = self.queue.lock().await.recv().await;
            match unit {
                Some(WorkUnit::Send) => match self.send_one().await {
                    Ok(()) => {}
                    // Remaining units are dropped until our stop unit
                    Err(SendError::Aborted) => {
                        trace!("Worker #{} skipped a unit of an aborted run", self.id);
                    }
                    Err(SendError::Signing(e)) => {
                        error!("Worker #{} failed to sign a transaction: {}", self.id, e);
                        self.barrier.abort(e.to_string());
                        return;
                    }
                    Err(SendError::Build(e)) => {
                        self.stats.build_failures.fetch_add(1, Ordering::SeqCst);
                        warn!("Worker #{} skipped a transaction: {}", self.id, e);
                    }
                    Err(SendError::Sink(e)) => {
                        self.stats.send_failures.fetch_add(1, Ordering::SeqCst);
                        warn!("Worker #{} failed to transmit a transaction: {}", self.id, e);
                    }
                },
                Some(WorkUnit::Stop) => {
                    self.stop();
                    return;
                }
                None => {
                    debug!("Work queue closed before worker #{} got its stop", self.id);
                    self.stop();
                    return;
                }
            }
        }
    }

    fn stop(&self) {
        if self.barrier.acknowledge_stop() {
            info!("Worker #{} was the last one to stop", self.id);
        } else {
            debug!("Worker #{} stopped", self.id);
        }
    }

    async fn send_one(&self) -> Result<(), SendError> {
        if self.barrier.is_aborted() {
            return Err(SendError::Aborted);
        }

        let mut tx = self.factory.build(&self.destination)?;
        let hash = sign_transaction(self.signer.as_ref(), &mut tx)?;
        // Another worker may have failed to sign in the meantime
        if self.barrier.is_aborted() {
            return Err(SendError::Aborted);
        }

        self.sink.transmit(&hash, Bytes::from(tx.to_bytes())).await?;
        self.stats.transmitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
