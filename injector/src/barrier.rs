//! Completion barrier of an injection run.
//!
//! Every worker acknowledges its stop unit here. The controller is released
//! once all of them did, or as soon as a worker aborts the run.

use crate::stats::RunStats;
use log::{debug, error};
use std::sync::{atomic::Ordering, Arc};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierState {
    Running,
    // Every worker acknowledged its stop unit
    Drained,
    // A worker hit a fatal error
    Aborted(String),
}

pub struct CompletionBarrier {
    workers: u64,
    stats: Arc<RunStats>,
    state: watch::Sender<BarrierState>,
}

impl CompletionBarrier {
    pub fn new(workers: u64, stats: Arc<RunStats>) -> Self {
        let (state, _) = watch::channel(BarrierState::Running);
        Self {
            workers,
            stats,
            state,
        }
    }

    // Record one stopped worker
    // Returns true for the worker completing the drain
    pub fn acknowledge_stop(&self) -> bool {
        let stopped = self.stats.stopped.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("{}/{} workers stopped", stopped, self.workers);
        if stopped != self.workers {
            return false;
        }

        self.state.send_if_modified(|state| {
            if *state == BarrierState::Running {
                *state = BarrierState::Drained;
                true
            } else {
                false
            }
        });
        true
    }

    // Abort the run, only the first reason is kept
    pub fn abort(&self, reason: String) {
        let aborted = self.state.send_if_modified(|state| {
            if *state == BarrierState::Running {
                *state = BarrierState::Aborted(reason);
                true
            } else {
                false
            }
        });

        if aborted {
            error!("Run aborted");
        }
    }

    // Checked by workers before each send
    pub fn is_aborted(&self) -> bool {
        matches!(*self.state.borrow(), BarrierState::Aborted(_))
    }

    pub fn state(&self) -> BarrierState {
        self.state.borrow().clone()
    }

    // Wait until the barrier leaves the running state
    pub async fn wait(&self) -> BarrierState {
        let mut receiver = self.state.subscribe();
        let state = match receiver
            .wait_for(|state| *state != BarrierState::Running)
            .await
        {
            Ok(state) => state.clone(),
            // The sender lives in self, it can't be closed while we wait
            Err(_) => self.state(),
        };
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_drained_after_all_workers() {
        let stats = Arc::new(RunStats::default());
        let barrier = Arc::new(CompletionBarrier::new(3, stats.clone()));

        assert!(!barrier.acknowledge_stop());
        assert!(!barrier.acknowledge_stop());
        assert_eq!(barrier.state(), BarrierState::Running);

        let waiter = {
            let barrier = barrier.clone();
            tokio::spawn(async move { barrier.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        assert!(barrier.acknowledge_stop());
        assert_eq!(waiter.await.unwrap(), BarrierState::Drained);
        assert_eq!(stats.stopped.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_abort_releases_waiter() {
        let barrier = CompletionBarrier::new(2, Arc::new(RunStats::default()));
        barrier.acknowledge_stop();
        assert!(!barrier.is_aborted());
        barrier.abort("signing key unavailable".to_owned());
        assert!(barrier.is_aborted());
        barrier.abort("second reason".to_owned());

        assert_eq!(
            barrier.wait().await,
            BarrierState::Aborted("signing key unavailable".to_owned())
        );

        // A late stop does not turn an aborted run into a drained one
        assert!(barrier.acknowledge_stop());
        assert!(matches!(barrier.state(), BarrierState::Aborted(_)));
    }
}
