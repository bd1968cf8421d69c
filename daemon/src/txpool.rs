//! Counting transaction pool.
//!
//! Every transaction is accepted. The pool only keeps the hashes it has
//! seen so duplicated nonces show up in the reports. At most
//! `max_tracked` hashes are kept: once full the set is cleared, so a
//! duplicate spanning a reset goes unnoticed.

use dashmap::DashSet;
use log::{info, warn};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use txbench_common::{crypto::Hash, transaction::Transaction};

// Throughput measured between two reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolReport {
    pub total: u64,
    pub received: u64,
    pub tps: f64,
}

// Hashes kept for duplicate detection, about 32 MB of keys
pub const DEFAULT_MAX_TRACKED_HASHES: usize = 1_000_000;

#[derive(Debug)]
pub struct TxPool {
    seen: DashSet<Hash>,
    max_tracked: usize,
    total: AtomicU64,
    duplicated: AtomicU64,
    invalid_signatures: AtomicU64,
    last_reported: AtomicU64,
}

impl TxPool {
    pub fn new() -> Self {
        Self::with_max_tracked(DEFAULT_MAX_TRACKED_HASHES)
    }

    pub fn with_max_tracked(max_tracked: usize) -> Self {
        Self {
            seen: DashSet::new(),
            max_tracked: max_tracked.max(1),
            total: AtomicU64::new(0),
            duplicated: AtomicU64::new(0),
            invalid_signatures: AtomicU64::new(0),
            last_reported: AtomicU64::new(0),
        }
    }

    // Add a transaction to the pool, this never fails
    // Signatures are only checked when `verify` is set
    pub fn add_transaction(&self, tx: &Transaction, verify: bool) -> Hash {
        let hash = tx.content_hash();
        if verify && !tx.verify_signatures() {
            self.invalid_signatures.fetch_add(1, Ordering::Relaxed);
        }

        if self.seen.len() >= self.max_tracked {
            warn!(
                "Tracking {} hashes, clearing the duplicate detection set",
                self.seen.len()
            );
            self.seen.clear();
        }

        if !self.seen.insert(hash.clone()) {
            self.duplicated.fetch_add(1, Ordering::Relaxed);
        }

        self.total.fetch_add(1, Ordering::Relaxed);
        hash
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.seen.contains(hash)
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }

    pub fn get_total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn get_duplicated(&self) -> u64 {
        self.duplicated.load(Ordering::Relaxed)
    }

    pub fn get_invalid_signatures(&self) -> u64 {
        self.invalid_signatures.load(Ordering::Relaxed)
    }

    // Compute the throughput since the previous report and log it
    pub fn report(&self, elapsed: Duration) -> PoolReport {
        let total = self.get_total();
        let previous = self.last_reported.swap(total, Ordering::Relaxed);
        let received = total.saturating_sub(previous);
        let secs = elapsed.as_secs_f64();
        let tps = if secs > 0.0 {
            received as f64 / secs
        } else {
            0.0
        };

        info!("total txn count {}, TPS = {:.2}/s", total, tps);
        PoolReport {
            total,
            received,
            tps,
        }
    }
}

impl Default for TxPool {
    fn default() -> Self {
        Self::new()
    }
}
