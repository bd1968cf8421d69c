use log::info;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

// Counters of one injection run
// Shared by every task of the run, never global
#[derive(Debug, Default)]
pub struct RunStats {
    // Send units released by the throttler
    pub requested: AtomicU64,
    // Workers that acknowledged their stop unit
    pub stopped: AtomicU64,
    // Transactions handed to the sink successfully
    pub transmitted: AtomicU64,
    pub send_failures: AtomicU64,
    pub build_failures: AtomicU64,
}

impl RunStats {
    pub fn report(&self, ticks: u64, elapsed: Duration) -> RunReport {
        RunReport {
            requested: self.requested.load(Ordering::SeqCst),
            stopped: self.stopped.load(Ordering::SeqCst),
            transmitted: self.transmitted.load(Ordering::SeqCst),
            send_failures: self.send_failures.load(Ordering::SeqCst),
            build_failures: self.build_failures.load(Ordering::SeqCst),
            ticks,
            elapsed,
        }
    }
}

/// Final summary of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub requested: u64,
    pub stopped: u64,
    pub transmitted: u64,
    pub send_failures: u64,
    pub build_failures: u64,
    // Throttler ticks that released at least one unit
    pub ticks: u64,
    pub elapsed: Duration,
}

impl RunReport {
    // Units picked up by a worker, whatever their outcome
    pub fn attempted(&self) -> u64 {
        self.transmitted + self.send_failures + self.build_failures
    }

    pub fn average_tps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.transmitted as f64 / secs
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        info!("=== Injection summary ===");
        info!("Duration: {:.2}s over {} ticks", self.elapsed.as_secs_f64(), self.ticks);
        info!("Requested: {}", self.requested);
        info!(
            "Transmitted: {} ({} send failures, {} build failures)",
            self.transmitted, self.send_failures, self.build_failures
        );
        info!("Workers stopped: {}", self.stopped);
        info!("Average TPS: {:.1}", self.average_tps());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_snapshot() {
        let stats = RunStats::default();
        stats.requested.store(10, Ordering::SeqCst);
        stats.transmitted.store(8, Ordering::SeqCst);
        stats.send_failures.store(1, Ordering::SeqCst);
        stats.build_failures.store(1, Ordering::SeqCst);

        let report = stats.report(1, Duration::from_secs(2));
        assert_eq!(report.attempted(), 10);
        assert_eq!(report.average_tps(), 4.0);
    }

    #[test]
    fn test_zero_elapsed() {
        let report = RunStats::default().report(0, Duration::ZERO);
        assert_eq!(report.average_tps(), 0.0);
    }
}
