//! StressPulse - CPU and disk-IO stress generator
//!
//! StressPulse keeps a configurable number of worker threads busy with a fixed
//! amount of hashing work, optionally overwriting a per-worker scratch file,
//! and reports how long the whole pool took.
//!
//! # Architecture
//!
//! - **Coordination modes**: isolated workers, a shared token relay, or the
//!   relay plus a contended spin lock
//! - **Work units**: chained SHA-512/256 rounds plus a probabilistic
//!   overwrite-in-place of the scratch file
//! - **Explicit parallelism**: worker count and optional CPU pinning are run
//!   parameters, nothing is process-global
//! - **Stats**: per-worker counters, live progress, process CPU utilization

pub mod config;
pub mod coordinator;
pub mod output;
pub mod stats;
pub mod sync;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::{BenchmarkConfig, ConfigError, CoordinationMode};
pub use coordinator::{run, Coordinator};
pub use stats::RunReport;
pub use sync::SpinLock;
pub use worker::Worker;

/// Result type used throughout StressPulse
pub type Result<T> = anyhow::Result<T>;
