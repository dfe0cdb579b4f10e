//! Worker thread implementation
//!
//! A Worker is the execution unit of a run. It owns everything it touches in
//! the hot loop: a private RNG, the handle of its scratch file, and a clone
//! of the shared read-only payload. Each iteration runs one
//! [`WorkUnit`](work_unit::WorkUnit); in the shared modes the iteration is
//! additionally gated by the token ring.
//!
//! # Lifecycle
//!
//! 1. **Creation**: `Worker::new()` seeds the RNG and opens `<dir>/<id>`
//! 2. **Execution**: `run()` performs the iteration loop
//! 3. **Completion**: returns `WorkerStats`
//!
//! A worker whose file cannot be opened never gets past step 1; the
//! coordinator records the failure and the rest of the run carries on.
//!
//! # Example
//!
//! ```no_run
//! use stresspulse::config::{BenchmarkConfig, CoordinationMode};
//! use stresspulse::util::buffer::PayloadBuffer;
//! use stresspulse::worker::Worker;
//! use std::sync::Arc;
//!
//! let config = Arc::new(BenchmarkConfig::new(
//!     CoordinationMode::Isolated, 1, 1000, 5.0, "/tmp", 4096,
//! )?);
//! let payload = PayloadBuffer::new(config.payload_bytes());
//!
//! let mut worker = Worker::new(0, config, payload)?;
//! let stats = worker.run(None, None);
//! println!("Completed {} iterations", stats.iterations);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod affinity;
pub mod work_unit;

use crate::config::BenchmarkConfig;
use crate::stats::{ProgressBoard, WorkerStats};
use crate::sync::{SpinLock, TokenRing};
use crate::util::buffer::PayloadBuffer;
use crate::Result;
use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use work_unit::{WorkUnit, WriteOutcome};

/// Upper bound of the random offset added to the time-based seed
const SEED_OFFSET_RANGE: u64 = 0xFFF_FFFF;

/// Worker thread state
///
/// # Thread Safety
///
/// Each worker owns its RNG and file handle and runs in its own thread. The
/// only state it shares is the read-only payload, the optional progress
/// board (its own slot only), and whatever coordination handles `run()` is
/// given.
pub struct Worker {
    /// Worker ID, also the scratch file name
    id: usize,

    /// Shared configuration
    config: Arc<BenchmarkConfig>,

    /// Private random source
    rng: Xoshiro256PlusPlus,

    /// Scratch file at `<write_dir>/<id>`
    file: File,

    /// Payload written on every write (shared, read-only)
    payload: PayloadBuffer,

    /// Shared progress counters for live updates (optional)
    progress: Option<Arc<ProgressBoard>>,
}

impl Worker {
    /// Create a new worker and open its scratch file
    ///
    /// The file is created if missing and truncated, so after the run its
    /// size is either 0 (never written) or exactly the payload size.
    ///
    /// # Errors
    ///
    /// Returns an error if the scratch file cannot be opened.
    pub fn new(id: usize, config: Arc<BenchmarkConfig>, payload: PayloadBuffer) -> Result<Self> {
        let path = config.worker_file(id);
        let file = open_scratch_file(&path)
            .with_context(|| format!("failed to create file {}", path.display()))?;

        Ok(Self {
            id,
            config,
            rng: Xoshiro256PlusPlus::seed_from_u64(Self::seed()),
            file,
            payload,
            progress: None,
        })
    }

    /// Publish per-iteration progress to a shared board
    pub fn set_progress(&mut self, progress: Arc<ProgressBoard>) {
        self.progress = Some(progress);
    }

    /// Wall-clock nanoseconds plus a random offset
    ///
    /// Workers started in the same instant still get different streams.
    fn seed() -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        now.wrapping_add(rand::thread_rng().gen_range(0..SEED_OFFSET_RANGE))
    }

    /// Run all configured iterations
    ///
    /// With `ring`, every iteration after the first waits for a token and each
    /// finished iteration publishes one. With `lock`, each work unit
    /// finalizes its digest under the lock.
    ///
    /// Never fails as a whole: a broken token channel ends the loop early and
    /// is recorded in the returned stats, write errors are counted.
    pub fn run(&mut self, ring: Option<&TokenRing>, lock: Option<&SpinLock>) -> WorkerStats {
        let start = Instant::now();
        let mut stats = WorkerStats::new(self.id);

        self.apply_affinity();

        let unit = WorkUnit {
            write_ratio: self.config.write_ratio(),
            hash_rounds: self.config.hash_rounds(),
            payload: self.payload.as_slice(),
            lock,
        };

        for iteration in 0..self.config.iterations() {
            if let Some(ring) = ring {
                if iteration != 0 {
                    if let Err(e) = ring.take() {
                        log::error!("worker {}: {:#}", self.id, e);
                        stats.failure = Some(e.to_string());
                        break;
                    }
                    stats.tokens_received += 1;
                }
            }

            let outcome = unit.consume_cpu(&mut self.rng, &mut self.file);

            let write_failed = match outcome.write {
                WriteOutcome::Failed(ref e) => {
                    if stats.write_errors == 0 {
                        log::warn!(
                            "worker {}: write to {} failed: {}",
                            self.id,
                            self.path().display(),
                            e
                        );
                    }
                    true
                }
                _ => false,
            };
            stats.record_iteration(matches!(outcome.write, WriteOutcome::Written), write_failed);

            if let Some(ref progress) = self.progress {
                progress.tick(self.id);
            }

            if let Some(ring) = ring {
                if let Err(e) = ring.publish(outcome.token) {
                    log::error!("worker {}: {:#}", self.id, e);
                    stats.failure = Some(e.to_string());
                    break;
                }
                stats.tokens_published += 1;
            }
        }

        if stats.write_errors > 1 {
            log::warn!("worker {}: {} writes failed in total", self.id, stats.write_errors);
        }

        stats.elapsed = start.elapsed();
        log::debug!(
            "worker {} done: {} iterations, {:.2}% writing, in {:?}",
            self.id,
            stats.iterations,
            stats.write_fraction() * 100.0,
            stats.elapsed
        );
        stats
    }

    /// Pin this thread to its round-robin core, if cores are configured
    ///
    /// Failure to pin is not fatal; the worker runs unpinned.
    fn apply_affinity(&self) {
        let Some(cores) = self.config.cpu_cores() else {
            return;
        };
        if let Some(core) = affinity::core_for_worker(cores, self.id) {
            match affinity::set_cpu_affinity(&[core]) {
                Ok(()) => log::debug!("worker {} pinned to CPU {}", self.id, core),
                Err(e) => log::warn!("worker {}: running unpinned: {:#}", self.id, e),
            }
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Path of this worker's scratch file
    pub fn path(&self) -> PathBuf {
        self.config.worker_file(self.id)
    }
}

fn open_scratch_file(path: &std::path::Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }

    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinationMode;

    fn create_test_config(
        dir: &std::path::Path,
        iterations: u64,
        write_ratio: f64,
    ) -> Arc<BenchmarkConfig> {
        Arc::new(
            BenchmarkConfig::new(CoordinationMode::Isolated, 1, iterations, write_ratio, dir, 256)
                .unwrap()
                .with_hash_rounds(8)
                .unwrap(),
        )
    }

    #[test]
    fn test_worker_creation_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path(), 1, 0.0);
        let worker = Worker::new(3, config.clone(), PayloadBuffer::new(256)).unwrap();

        assert_eq!(worker.id(), 3);
        assert_eq!(worker.path(), dir.path().join("3"));
        assert!(dir.path().join("3").exists());
    }

    #[test]
    fn test_worker_creation_fails_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path(), 1, 0.0);
        drop(dir);

        assert!(Worker::new(0, config, PayloadBuffer::new(256)).is_err());
    }

    #[test]
    fn test_worker_truncates_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0"), vec![0xEEu8; 4096]).unwrap();

        let config = create_test_config(dir.path(), 5, 100.0);
        let mut worker = Worker::new(0, config, PayloadBuffer::new(256)).unwrap();
        worker.run(None, None);

        let data = std::fs::read(dir.path().join("0")).unwrap();
        assert_eq!(data, PayloadBuffer::new(256).to_vec());
    }

    #[test]
    fn test_run_isolated_counts() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path(), 25, 100.0);
        let board = Arc::new(ProgressBoard::new(1));

        let mut worker = Worker::new(0, config, PayloadBuffer::new(256)).unwrap();
        worker.set_progress(board.clone());
        let stats = worker.run(None, None);

        assert_eq!(stats.iterations, 25);
        assert_eq!(stats.writes, 25);
        assert_eq!(stats.write_errors, 0);
        assert_eq!(stats.tokens_received, 0);
        assert_eq!(stats.tokens_published, 0);
        assert!(!stats.is_failed());
        assert_eq!(board.completed(0), 25);
    }

    #[test]
    fn test_run_no_writes_leaves_file_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path(), 50, 0.0);

        let mut worker = Worker::new(0, config, PayloadBuffer::new(256)).unwrap();
        let stats = worker.run(None, None);

        assert_eq!(stats.writes, 0);
        assert_eq!(std::fs::metadata(dir.path().join("0")).unwrap().len(), 0);
    }

    #[test]
    fn test_single_worker_ring_relays_own_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path(), 10, 0.0);
        let ring = TokenRing::new(1);
        let lock = SpinLock::new();

        let mut worker = Worker::new(0, config, PayloadBuffer::new(256)).unwrap();
        let stats = worker.run(Some(&ring), Some(&lock));

        assert_eq!(stats.iterations, 10);
        assert_eq!(stats.tokens_received, 9);
        assert_eq!(stats.tokens_published, 10);
        // Last token stays queued
        assert_eq!(ring.len(), 1);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_held_lock_stalls_spinlock_worker() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path(), 3, 0.0);
        let board = Arc::new(ProgressBoard::new(1));
        let lock = Arc::new(SpinLock::new());

        let guard = lock.lock();

        let handle = {
            let board = board.clone();
            let lock = lock.clone();
            std::thread::spawn(move || {
                let mut worker = Worker::new(0, config, PayloadBuffer::new(256)).unwrap();
                worker.set_progress(board);
                worker.run(None, Some(&*lock))
            })
        };

        // The first unit cannot finalize while the lock is held
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(board.completed(0), 0);

        drop(guard);
        let stats = handle.join().unwrap();
        assert_eq!(stats.iterations, 3);
        assert_eq!(board.completed(0), 3);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_workers_share_lock_and_ring() {
        let dir = tempfile::tempdir().unwrap();
        let workers = 4;
        let config = create_test_config(dir.path(), 40, 10.0);
        let ring = TokenRing::new(workers);
        let lock = Arc::new(SpinLock::new());
        let payload = PayloadBuffer::new(256);

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let config = config.clone();
                let ring = ring.clone();
                let lock = lock.clone();
                let payload = payload.clone();
                std::thread::spawn(move || {
                    let mut worker = Worker::new(id, config, payload).unwrap();
                    worker.run(Some(&ring), Some(&*lock))
                })
            })
            .collect();

        for handle in handles {
            let stats = handle.join().unwrap();
            assert_eq!(stats.iterations, 40);
            assert_eq!(stats.tokens_published, 40);
            assert!(!stats.is_failed());
        }
        assert!(!lock.is_locked());
        assert!(ring.len() <= ring.capacity());
    }

    #[test]
    fn test_seeds_differ() {
        let seeds: std::collections::HashSet<u64> = (0..16).map(|_| Worker::seed()).collect();
        assert!(seeds.len() > 1);
    }
}
