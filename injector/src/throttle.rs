//! Rate throttler releasing work units to the worker pool.

use log::{info, warn};
use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};
use tokio::{
    select,
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{config::RunConfig, stats::RunStats, worker::WorkUnit};

// What the throttler did before returning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThrottleReport {
    pub ticks: u64,
    pub released: u64,
    pub stops: u64,
    pub cancelled: bool,
}

pub struct Throttler {
    queue: mpsc::Sender<WorkUnit>,
    stats: Arc<RunStats>,
    count: u64,
    tps: u64,
    workers: u64,
    tick_interval: Duration,
}

impl Throttler {
    pub fn new(queue: mpsc::Sender<WorkUnit>, stats: Arc<RunStats>, config: &RunConfig) -> Self {
        Self {
            queue,
            stats,
            count: config.count,
            tps: config.tps,
            workers: config.workers as u64,
            tick_interval: config.tick_interval,
        }
    }

    // Release `tps` send units per tick until `count` were released,
    // then one stop unit per worker
    pub async fn run(self, cancel: CancellationToken) -> ThrottleReport {
        let mut report = ThrottleReport::default();
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'ticks: while report.released < self.count {
            select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break 'ticks;
                }
                _ = ticker.tick() => {}
            }

            report.ticks += 1;
            let mut released = 0;
            while released < self.tps && report.released < self.count {
                select! {
                    biased;
                    _ = cancel.cancelled() => {
                        report.cancelled = true;
                        break 'ticks;
                    }
                    res = self.queue.send(WorkUnit::Send) => {
                        if res.is_err() {
                            warn!("Work queue closed, no worker left");
                            return report;
                        }
                    }
                }

                report.released = self.stats.requested.fetch_add(1, Ordering::SeqCst) + 1;
                released += 1;
            }

            info!(
                "Tick #{}: released {} transactions, {}/{} requested",
                report.ticks, released, report.released, self.count
            );
        }

        if report.cancelled {
            info!(
                "Injection cancelled after {}/{} requests",
                report.released, self.count
            );
        }

        for _ in 0..self.workers {
            if self.queue.send(WorkUnit::Stop).await.is_err() {
                warn!("Work queue closed while stopping workers");
                break;
            }
            report.stops += 1;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;
    use txbench_common::crypto::{Address, ADDRESS_SIZE};

    fn config(count: u64, tps: u64, workers: usize) -> RunConfig {
        RunConfig {
            count,
            tps,
            workers,
            queue_capacity: 8,
            tick_interval: Duration::from_secs(1),
            destination: Address::new([0; ADDRESS_SIZE]),
            consensus: false,
        }
    }

    // Drain the queue, recording when each unit was received
    async fn collect(mut receiver: mpsc::Receiver<WorkUnit>) -> Vec<(WorkUnit, Duration)> {
        let start = Instant::now();
        let mut units = Vec::new();
        while let Some(unit) = receiver.recv().await {
            units.push((unit, start.elapsed()));
        }
        units
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_release() {
        let stats = Arc::new(RunStats::default());
        let (sender, receiver) = mpsc::channel(8);
        let collector = tokio::spawn(collect(receiver));

        let report = Throttler::new(sender, stats.clone(), &config(100, 20, 4))
            .run(CancellationToken::new())
            .await;
        let units = collector.await.unwrap();

        assert_eq!(
            report,
            ThrottleReport {
                ticks: 5,
                released: 100,
                stops: 4,
                cancelled: false
            }
        );
        assert_eq!(stats.requested.load(Ordering::SeqCst), 100);

        let sends: Vec<_> = units.iter().filter(|(u, _)| *u == WorkUnit::Send).collect();
        assert_eq!(sends.len(), 100);
        // 20 units per second, starting right away
        for (i, (_, at)) in sends.iter().enumerate() {
            assert_eq!(at.as_secs(), (i / 20) as u64);
        }

        // Stops only after the last send
        assert_eq!(units.len(), 104);
        assert!(units[100..].iter().all(|(u, _)| *u == WorkUnit::Stop));
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_below_tps() {
        let stats = Arc::new(RunStats::default());
        let (sender, receiver) = mpsc::channel(64);
        let collector = tokio::spawn(collect(receiver));

        let report = Throttler::new(sender, stats, &config(7, 1000, 2))
            .run(CancellationToken::new())
            .await;
        let units = collector.await.unwrap();

        assert_eq!(report.ticks, 1);
        assert_eq!(report.released, 7);
        assert_eq!(units.len(), 9);
        assert!(units.iter().all(|(_, at)| at.is_zero()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remainder_in_last_tick() {
        let stats = Arc::new(RunStats::default());
        let (sender, receiver) = mpsc::channel(64);
        let collector = tokio::spawn(collect(receiver));

        let report = Throttler::new(sender, stats, &config(25, 10, 1))
            .run(CancellationToken::new())
            .await;
        let units = collector.await.unwrap();

        assert_eq!(report.ticks, 3);
        let last_tick = units
            .iter()
            .filter(|(u, at)| *u == WorkUnit::Send && at.as_secs() == 2)
            .count();
        assert_eq!(last_tick, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_issues_stops() {
        let stats = Arc::new(RunStats::default());
        let (sender, receiver) = mpsc::channel(64);
        let collector = tokio::spawn(collect(receiver));

        let cancel = CancellationToken::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                cancel.cancel();
            })
        };

        let report = Throttler::new(sender, stats, &config(100, 10, 3))
            .run(cancel)
            .await;
        canceller.await.unwrap();
        let units = collector.await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.released, 20);
        assert_eq!(report.stops, 3);
        assert_eq!(units.len(), 23);
    }

    #[tokio::test]
    async fn test_closed_queue() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);

        let report = Throttler::new(sender, Arc::new(RunStats::default()), &config(10, 10, 2))
            .run(CancellationToken::new())
            .await;
        assert_eq!(report.released, 0);
        assert_eq!(report.stops, 0);
    }
}
