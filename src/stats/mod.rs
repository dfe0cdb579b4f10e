//! Statistics collection
//!
//! Per-worker counters and the run report.
//!
//! - **WorkerStats**: owned by one worker while it runs, returned on join
//! - **ProgressBoard**: cache-line aligned atomic iteration counters, one per
//!   worker, written only by that worker and read by the live monitor
//! - **RunReport**: elapsed wall-clock time plus every worker's stats
//!
//! # Example
//!
//! ```
//! use stresspulse::stats::WorkerStats;
//!
//! let mut stats = WorkerStats::new(0);
//! stats.record_iteration(true, false);
//! stats.record_iteration(false, false);
//!
//! assert_eq!(stats.iterations, 2);
//! assert_eq!(stats.writes, 1);
//! ```

pub mod live;

use crate::config::{BenchmarkConfig, CoordinationMode};
use crate::util::resource::CpuUsage;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Cache-line aligned atomic counter to prevent false sharing
///
/// Each worker bumps its own counter once per iteration. Aligning each counter
/// to its own 64-byte line keeps those stores from invalidating a neighbour's
/// cache line.
///
/// # Memory Layout
///
/// ```text
/// [value: 8 bytes][padding: 56 bytes] = 64 bytes total
/// ```
#[repr(align(64))]
#[derive(Debug)]
pub struct AlignedCounter {
    value: AtomicU64,
    _padding: [u8; 56],
}

impl AlignedCounter {
    /// Create a new counter with initial value 0
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
            _padding: [0; 56],
        }
    }

    /// Increment the counter by the specified amount
    ///
    /// Relaxed ordering: readers only need an eventually consistent view.
    #[inline]
    pub fn add(&self, val: u64) {
        self.value.fetch_add(val, Ordering::Relaxed);
    }

    /// Get the current value of the counter
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for AlignedCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Completed-iteration counters for every worker of a run
#[derive(Debug)]
pub struct ProgressBoard {
    counters: Vec<AlignedCounter>,
}

impl ProgressBoard {
    pub fn new(workers: usize) -> Self {
        Self {
            counters: (0..workers).map(|_| AlignedCounter::new()).collect(),
        }
    }

    /// Record one completed iteration for `worker_id`
    #[inline]
    pub fn tick(&self, worker_id: usize) {
        if let Some(counter) = self.counters.get(worker_id) {
            counter.add(1);
        }
    }

    /// Iterations completed by one worker
    pub fn completed(&self, worker_id: usize) -> u64 {
        self.counters.get(worker_id).map_or(0, AlignedCounter::get)
    }

    /// Snapshot of every worker's completed iterations
    pub fn snapshot(&self) -> Vec<u64> {
        self.counters.iter().map(AlignedCounter::get).collect()
    }

    /// Iterations completed across all workers
    pub fn total(&self) -> u64 {
        self.counters.iter().map(AlignedCounter::get).sum()
    }

    /// Difference between the fastest and slowest worker
    pub fn spread(&self) -> u64 {
        let snapshot = self.snapshot();
        match (snapshot.iter().max(), snapshot.iter().min()) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        }
    }
}

/// Statistics for one worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerStats {
    pub worker_id: usize,
    /// Work units completed
    pub iterations: u64,
    /// Successful payload writes
    pub writes: u64,
    /// Attempted writes that failed
    pub write_errors: u64,
    /// Tokens taken from the shared channel
    pub tokens_received: u64,
    /// Tokens published to the shared channel
    pub tokens_published: u64,
    /// Why the worker abandoned its run, if it did
    pub failure: Option<String>,
    /// Worker's own wall time, from spawn to exit
    pub elapsed: Duration,
}

impl WorkerStats {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    /// Stats for a worker that could not run at all
    pub fn failed(worker_id: usize, reason: impl Into<String>) -> Self {
        Self {
            worker_id,
            failure: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Record one completed work unit
    #[inline]
    pub fn record_iteration(&mut self, wrote: bool, write_failed: bool) {
        self.iterations += 1;
        if wrote {
            self.writes += 1;
        }
        if write_failed {
            self.write_errors += 1;
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Fraction of iterations that attempted a write
    pub fn write_fraction(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            (self.writes + self.write_errors) as f64 / self.iterations as f64
        }
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: CoordinationMode,
    /// Wall-clock time around the whole worker pool
    pub elapsed: Duration,
    /// One entry per worker, ordered by worker id
    pub workers: Vec<WorkerStats>,
    /// Process CPU utilization over the run, where measurable
    pub cpu: Option<CpuUsage>,
}

impl RunReport {
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn total_iterations(&self) -> u64 {
        self.workers.iter().map(|w| w.iterations).sum()
    }

    pub fn total_writes(&self) -> u64 {
        self.workers.iter().map(|w| w.writes).sum()
    }

    pub fn total_write_errors(&self) -> u64 {
        self.workers.iter().map(|w| w.write_errors).sum()
    }

    pub fn total_tokens_published(&self) -> u64 {
        self.workers.iter().map(|w| w.tokens_published).sum()
    }

    /// Workers that abandoned their run
    pub fn failed_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.is_failed()).count()
    }

    /// Scratch files of workers that wrote at least once
    pub fn written_files(&self, config: &BenchmarkConfig) -> Vec<PathBuf> {
        self.workers
            .iter()
            .filter(|w| w.writes > 0)
            .map(|w| config.worker_file(w.worker_id))
            .collect()
    }
}
