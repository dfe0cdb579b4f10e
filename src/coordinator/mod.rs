//! Run coordination
//!
//! The coordinator owns a run from start to finish:
//!
//! 1. **Initializing**: build the shared payload, snapshot process CPU time,
//!    start the wall-clock timer
//! 2. **Running**: spawn one named OS thread per worker; in the shared modes
//!    every worker gets a handle to the token ring (and the spinlock)
//! 3. **Draining**: join every worker thread
//! 4. **Reporting**: stop the timer and assemble the [`RunReport`]
//!
//! All workers are spawned before the first join, so the token ring always has
//! every participant live. There is no cancellation: a run ends when the last
//! worker finishes its iterations (or gives up on a broken file).

use crate::config::BenchmarkConfig;
use crate::stats::{ProgressBoard, RunReport, WorkerStats};
use crate::sync::{SpinLock, TokenRing};
use crate::util::buffer::PayloadBuffer;
use crate::util::resource::CpuSnapshot;
use crate::worker::Worker;
use crate::Result;
use anyhow::Context;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Phase of a run, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Initializing,
    Running,
    Draining,
    Reporting,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Initializing => "initializing",
            RunPhase::Running => "running",
            RunPhase::Draining => "draining",
            RunPhase::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// Runs one benchmark according to its configuration
pub struct Coordinator {
    config: Arc<BenchmarkConfig>,
    progress: Option<Arc<ProgressBoard>>,
    phase: RunPhase,
}

impl Coordinator {
    pub fn new(config: Arc<BenchmarkConfig>) -> Self {
        Self {
            config,
            progress: None,
            phase: RunPhase::Initializing,
        }
    }

    /// Have workers report per-iteration progress to `board`
    ///
    /// The board must have one slot per configured worker.
    pub fn with_progress(mut self, board: Arc<ProgressBoard>) -> Self {
        self.progress = Some(board);
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        log::debug!("run phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Execute the run and return its report
    ///
    /// # Errors
    ///
    /// Fails only if a worker thread cannot be spawned or panics. Workers that
    /// cannot open their file are recorded as failed in the report instead.
    pub fn run(&mut self) -> Result<RunReport> {
        self.phase = RunPhase::Initializing;
        let mode = self.config.mode();
        let workers = self.config.workers();

        let payload = PayloadBuffer::new(self.config.payload_bytes());
        let ring = mode.uses_token_ring().then(|| TokenRing::new(workers));
        let lock = mode.uses_spinlock().then(|| Arc::new(SpinLock::new()));
        log::debug!(
            "{} workers, mode {}, {} iterations each",
            workers,
            mode,
            self.config.iterations()
        );
        if let Some(ref ring) = ring {
            log::debug!("token ring capacity {}", ring.capacity());
        }

        let cpu_start = CpuSnapshot::take();
        let start = Instant::now();

        self.enter(RunPhase::Running);
        let mut handles: Vec<JoinHandle<WorkerStats>> = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let config = self.config.clone();
            let payload = payload.clone();
            let ring = ring.clone();
            let lock = lock.clone();
            let progress = self.progress.clone();

            let handle = thread::Builder::new()
                .name(format!("worker-{}", worker_id))
                .spawn(move || {
                    let mut worker = match Worker::new(worker_id, config, payload) {
                        Ok(worker) => worker,
                        Err(e) => {
                            log::error!("worker {}: {:#}", worker_id, e);
                            return WorkerStats::failed(worker_id, format!("{:#}", e));
                        }
                    };
                    if let Some(progress) = progress {
                        worker.set_progress(progress);
                    }
                    worker.run(ring.as_ref(), lock.as_deref())
                })
                .with_context(|| format!("failed to spawn worker {}", worker_id))?;

            handles.push(handle);
        }

        // Workers clone the ring; the coordinator's copy must not keep it alive
        drop(ring);

        self.enter(RunPhase::Draining);
        let mut stats = Vec::with_capacity(workers);
        for (worker_id, handle) in handles.into_iter().enumerate() {
            let worker_stats = handle
                .join()
                .map_err(|_| anyhow::anyhow!("worker {} thread panicked", worker_id))?;
            stats.push(worker_stats);
        }

        self.enter(RunPhase::Reporting);
        let elapsed = start.elapsed();
        let cpu = cpu_start.and_then(|before| CpuSnapshot::take().map(|after| after.usage_since(&before)));

        let report = RunReport {
            mode,
            elapsed,
            workers: stats,
            cpu,
        };

        if report.failed_workers() > 0 {
            log::warn!(
                "{} of {} workers failed",
                report.failed_workers(),
                workers
            );
        }
        log::debug!(
            "{} work units in {:?}",
            report.total_iterations(),
            report.elapsed
        );

        Ok(report)
    }
}

/// Run one benchmark with `config`
pub fn run(config: &BenchmarkConfig) -> Result<RunReport> {
    Coordinator::new(Arc::new(config.clone())).run()
}
