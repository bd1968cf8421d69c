//! Run controller: wires the throttler, the worker pool and the completion barrier.

use futures::{stream::FuturesUnordered, StreamExt};
use log::{error, info, warn};
use std::{sync::Arc, time::Instant};
use tokio::{
    select,
    sync::{mpsc, Mutex},
};
use tokio_util::sync::CancellationToken;
use txbench_common::{crypto::Signer, tokio::spawn_task};

use crate::{
    barrier::{BarrierState, CompletionBarrier},
    config::RunConfig,
    error::InjectorError,
    factory::{TransactionFactory, TRANSFER_AMOUNT},
    sink::TransactionSink,
    stats::{RunReport, RunStats},
    throttle::Throttler,
    worker::Worker,
};

pub struct Injector {
    config: RunConfig,
    factory: Arc<TransactionFactory>,
    signer: Arc<dyn Signer>,
    sink: Arc<dyn TransactionSink>,
}

impl Injector {
    pub fn new(
        config: RunConfig,
        signer: Arc<dyn Signer>,
        sink: Arc<dyn TransactionSink>,
    ) -> Result<Self, InjectorError> {
        let source = signer.public_key().to_address();
        let factory = TransactionFactory::seeded(source, TRANSFER_AMOUNT);
        Self::with_factory(config, factory, signer, sink)
    }

    pub fn with_factory(
        config: RunConfig,
        factory: TransactionFactory,
        signer: Arc<dyn Signer>,
        sink: Arc<dyn TransactionSink>,
    ) -> Result<Self, InjectorError> {
        config.validate()?;
        Ok(Self {
            config,
            factory: Arc::new(factory),
            signer,
            sink,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    // Run until every worker acknowledged its stop unit
    // Cancelling the token stops the release of new units, the queue is still drained
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport, InjectorError> {
        let config = &self.config;
        info!(
            "Starting injection: {} transactions at {} TPS with {} workers",
            config.count, config.tps, config.workers
        );

        let stats = Arc::new(RunStats::default());
        let barrier = Arc::new(CompletionBarrier::new(config.workers as u64, stats.clone()));
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let start = Instant::now();

        // Workers hold the only references to the receiver,
        // so the queue closes once all of them exited
        let queue = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(config.workers);
        for id in 0..config.workers {
            let worker = Worker::new(
                id,
                queue.clone(),
                self.factory.clone(),
                self.signer.clone(),
                self.sink.clone(),
                config.destination,
                stats.clone(),
                barrier.clone(),
            );
            workers.push(spawn_task(format!("worker-{}", id), worker.run()));
        }
        drop(queue);

        let throttle_cancel = cancel.child_token();
        let throttler = Throttler::new(sender, stats.clone(), config);
        let throttle_handle = spawn_task("throttler", throttler.run(throttle_cancel.clone()));

        // A worker task that dies never acknowledges its stop unit,
        // so its failure aborts the run instead of stalling the barrier
        let mut running: FuturesUnordered<_> = workers.into_iter().collect();
        let mut task_failure = None;
        let state = loop {
            select! {
                state = barrier.wait() => break state,
                Some(result) = running.next() => {
                    if let Err(e) = result {
                        error!("Worker task failed: {}", e);
                        barrier.abort(e.to_string());
                        task_failure.get_or_insert(e);
                    }
                }
            }
        };

        if let BarrierState::Aborted(reason) = &state {
            error!("Stopping injection: {}", reason);
            throttle_cancel.cancel();
        }

        let throttle_report = throttle_handle.await?;
        while let Some(result) = running.next().await {
            if let Err(e) = result {
                warn!("Worker task failed: {}", e);
                task_failure.get_or_insert(e);
            }
        }

        let report = stats.report(throttle_report.ticks, start.elapsed());
        if let Some(e) = task_failure {
            return Err(InjectorError::Task(e));
        }

        match state {
            BarrierState::Aborted(reason) => Err(InjectorError::Signing(reason)),
            _ => {
                if throttle_report.cancelled {
                    warn!(
                        "Injection interrupted after {}/{} requests",
                        report.requested, config.count
                    );
                }
                Ok(report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::{
        collections::HashSet,
        sync::{
            atomic::{AtomicU64, Ordering},
            Mutex as StdMutex,
        },
        time::Duration,
    };
    use txbench_common::crypto::{
        Address, Hash, PublicKey, Signature, SignerError, ADDRESS_SIZE,
    };
    use txbench_wallet::Account;

    use crate::{
        sink::SinkError,
        transport::TransportError,
    };

    // Records every transmitted hash, failing on the configured call
    #[derive(Default)]
    struct MockSink {
        calls: AtomicU64,
        fail_on: Option<u64>,
        hashes: StdMutex<Vec<Hash>>,
    }

    #[async_trait]
    impl TransactionSink for MockSink {
        async fn transmit(&self, hash: &Hash, _bytes: Bytes) -> Result<(), SinkError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(call) == self.fail_on {
                return Err(TransportError::SendError.into());
            }
            self.hashes.lock().unwrap().push(hash.clone());
            Ok(())
        }
    }

    // Signer whose key is never available
    struct BrokenSigner(PublicKey);

    impl Signer for BrokenSigner {
        fn public_key(&self) -> PublicKey {
            self.0
        }

        fn sign_hash(&self, _hash: &Hash) -> Result<Signature, SignerError> {
            Err(SignerError::KeyUnavailable("hardware key removed".to_owned()))
        }
    }

    // Valid key that fails once, on the configured call
    struct FlakySigner {
        account: Account,
        calls: AtomicU64,
        fail_on: u64,
    }

    impl Signer for FlakySigner {
        fn public_key(&self) -> PublicKey {
            self.account.public_key()
        }

        fn sign_hash(&self, hash: &Hash) -> Result<Signature, SignerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                return Err(SignerError::Primitive("corrupted key".to_owned()));
            }
            self.account.sign_hash(hash)
        }
    }

    struct PanickingSink;

    #[async_trait]
    impl TransactionSink for PanickingSink {
        async fn transmit(&self, _hash: &Hash, _bytes: Bytes) -> Result<(), SinkError> {
            panic!("sink bug");
        }
    }

    fn run_config(count: u64, tps: u64, workers: usize) -> RunConfig {
        RunConfig {
            count,
            tps,
            workers,
            queue_capacity: 16,
            tick_interval: Duration::from_millis(20),
            destination: Address::new([9; ADDRESS_SIZE]),
            consensus: false,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_full_run() {
        let sink = Arc::new(MockSink::default());
        let injector = Injector::new(
            run_config(100, 20, 4),
            Arc::new(Account::generate("test")),
            sink.clone(),
        )
        .unwrap();

        let report = injector.run(CancellationToken::new()).await.unwrap();
        assert_eq!(report.requested, 100);
        assert_eq!(report.transmitted, 100);
        assert_eq!(report.stopped, 4);
        assert_eq!(report.ticks, 5);

        // Every transaction carries its own nonce
        let hashes = sink.hashes.lock().unwrap();
        let unique: HashSet<_> = hashes.iter().collect();
        assert_eq!(unique.len(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_transport_failure_is_not_fatal() {
        let sink = Arc::new(MockSink {
            fail_on: Some(37),
            ..Default::default()
        });
        let injector = Injector::new(
            run_config(100, 20, 4),
            Arc::new(Account::generate("test")),
            sink.clone(),
        )
        .unwrap();

        let report = injector.run(CancellationToken::new()).await.unwrap();
        assert_eq!(report.requested, 100);
        assert_eq!(report.attempted(), 100);
        assert_eq!(report.transmitted, 99);
        assert_eq!(report.send_failures, 1);
        assert_eq!(report.stopped, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_signing_failure_aborts() {
        let sink = Arc::new(MockSink::default());
        let signer = BrokenSigner(Account::generate("test").public_key());
        let injector =
            Injector::new(run_config(100, 20, 4), Arc::new(signer), sink.clone()).unwrap();

        let result = injector.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(InjectorError::Signing(_))));
        assert!(sink.hashes.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_nothing_sent_after_signing_failure() {
        let sink = Arc::new(MockSink::default());
        let signer = Arc::new(FlakySigner {
            account: Account::generate("test"),
            calls: AtomicU64::new(0),
            fail_on: 5,
        });
        let mut config = run_config(200, 200, 4);
        config.queue_capacity = 128;
        let injector = Injector::new(config, signer.clone(), sink.clone()).unwrap();

        let result = injector.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(InjectorError::Signing(_))));

        // Only signatures already in flight on the other workers may follow the failure
        let in_flight = 4 - 1;
        let sign_calls = signer.calls.load(Ordering::SeqCst);
        assert!(sign_calls <= 5 + in_flight, "{} sign calls", sign_calls);
        let transmitted = sink.hashes.lock().unwrap().len() as u64;
        assert!(transmitted < 5 + in_flight, "{} transmitted", transmitted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_panic_ends_the_run() {
        let injector = Injector::new(
            run_config(10, 10, 2),
            Arc::new(Account::generate("test")),
            Arc::new(PanickingSink),
        )
        .unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            injector.run(CancellationToken::new()),
        )
        .await
        .expect("run must not wait for a dead worker");
        assert!(matches!(result, Err(InjectorError::Task(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancelled_run_drains() {
        let sink = Arc::new(MockSink::default());
        let mut config = run_config(1000, 10, 3);
        config.tick_interval = Duration::from_millis(50);
        let injector =
            Injector::new(config, Arc::new(Account::generate("test")), sink.clone()).unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            trigger.cancel();
        });

        let report = injector.run(cancel).await.unwrap();
        assert!(report.requested < 1000);
        assert_eq!(report.transmitted, report.requested);
        assert_eq!(report.stopped, 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Injector::new(
            run_config(0, 20, 4),
            Arc::new(Account::generate("test")),
            Arc::new(MockSink::default()),
        );
        assert!(matches!(result, Err(InjectorError::Config(_))));
    }
}
