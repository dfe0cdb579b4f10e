//! Live progress updates
//!
//! While a run is in flight, a monitor thread samples the [`ProgressBoard`]
//! at a fixed interval and prints one progress line per sample: elapsed time,
//! completed work units out of the planned total, and the gap between the
//! fastest and slowest worker.
//!
//! # Example
//!
//! ```no_run
//! use stresspulse::stats::live::LiveMonitor;
//! use stresspulse::stats::ProgressBoard;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let board = Arc::new(ProgressBoard::new(4));
//! let monitor = LiveMonitor::spawn(board.clone(), Duration::from_secs(1), 4_000);
//! // ... workers tick the board ...
//! monitor.stop();
//! ```

use crate::stats::ProgressBoard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Progress tracker that turns board samples into display lines
#[derive(Debug)]
pub struct LiveProgress {
    interval: Duration,
    last_update: Instant,
    run_start: Instant,
    planned_units: u64,
    last_total: u64,
    current: LiveSnapshot,
    update_count: u64,
}

/// One sample of the board
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSnapshot {
    pub total: u64,
    pub spread: u64,
}

impl LiveProgress {
    pub fn new(interval: Duration, planned_units: u64) -> Self {
        let now = Instant::now();
        Self {
            interval,
            last_update: now,
            run_start: now,
            planned_units,
            last_total: 0,
            current: LiveSnapshot::default(),
            update_count: 0,
        }
    }

    /// Whether the interval has elapsed since the last update
    pub fn should_update(&self) -> bool {
        self.last_update.elapsed() >= self.interval
    }

    /// Sample the board
    pub fn update(&mut self, board: &ProgressBoard) {
        self.last_total = self.current.total;
        self.current = LiveSnapshot {
            total: board.total(),
            spread: board.spread(),
        };
        self.last_update = Instant::now();
        self.update_count += 1;
    }

    /// Work units completed since the previous update
    pub fn delta(&self) -> u64 {
        self.current.total.saturating_sub(self.last_total)
    }

    pub fn percent_done(&self) -> f64 {
        crate::util::time::percent(self.current.total, self.planned_units)
    }

    /// Progress line for the latest sample
    pub fn format_line(&self) -> String {
        format!(
            "[{:4}s] {}/{} units ({:.1}%), +{} since last, worker spread {}",
            self.run_start.elapsed().as_secs(),
            self.current.total,
            self.planned_units,
            self.percent_done(),
            self.delta(),
            self.current.spread
        )
    }

    pub fn display_console(&self) {
        println!("{}", self.format_line());
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn snapshot(&self) -> &LiveSnapshot {
        &self.current
    }
}

/// Background thread printing progress until stopped
pub struct LiveMonitor {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LiveMonitor {
    /// Start printing progress for `board` every `interval`
    pub fn spawn(board: Arc<ProgressBoard>, interval: Duration, planned_units: u64) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_stop = stop_flag.clone();

        // Short polling tick so stop() returns promptly
        let tick = interval.min(Duration::from_millis(50));

        let handle = std::thread::Builder::new()
            .name("live-monitor".to_string())
            .spawn(move || {
                let mut live = LiveProgress::new(interval, planned_units);
                while !thread_stop.load(Ordering::Relaxed) {
                    std::thread::sleep(tick);
                    if live.should_update() {
                        live.update(&board);
                        live.display_console();
                    }
                }
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("live progress disabled: failed to spawn monitor thread: {}", e);
                None
            }
        };

        Self { stop_flag, handle }
    }

    /// Stop the monitor and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("live monitor thread panicked");
            }
        }
    }
}

impl Drop for LiveMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
