//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! Every path ends in a [`BenchmarkConfig`], which is validated once and never
//! mutated afterwards.

pub mod cli;
pub mod toml;
pub mod validator;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable that supplies the default worker count
pub const ENV_NUM_THREADS: &str = "NUM_THREADS";

/// Worker count used when neither the CLI nor the environment sets one
pub const DEFAULT_WORKERS: usize = 2;

/// Iterations per worker when a config file omits them
pub const DEFAULT_ITERATIONS: u64 = 10_000;

/// Write ratio (percent) when a config file omits it
pub const DEFAULT_WRITE_RATIO: f64 = 0.05;

/// Write payload size when a config file omits it (16 KiB)
pub const DEFAULT_PAYLOAD_BYTES: usize = 16 * 1024;

/// Hash rounds per work unit
pub const DEFAULT_HASH_ROUNDS: usize = 128;

/// Largest accepted iteration count per worker
pub const MAX_ITERATIONS: u64 = i32::MAX as u64;

/// Largest accepted write payload size
pub const MAX_PAYLOAD_BYTES: usize = i32::MAX as usize;

/// How workers synchronize with each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum CoordinationMode {
    /// Workers never communicate
    #[value(name = "isolation", alias = "isolated")]
    #[serde(rename = "isolation", alias = "isolated")]
    Isolated,
    /// Workers relay result tokens through a bounded channel
    #[value(name = "shared")]
    #[serde(rename = "shared")]
    Shared,
    /// Token relay plus a shared spin lock around each result
    #[value(name = "spinlock")]
    #[serde(rename = "spinlock")]
    SharedSpinlock,
}

impl CoordinationMode {
    /// Whether workers pass tokens through the shared channel
    pub fn uses_token_ring(self) -> bool {
        matches!(self, Self::Shared | Self::SharedSpinlock)
    }

    /// Whether work units finalize their result under the shared spin lock
    pub fn uses_spinlock(self) -> bool {
        matches!(self, Self::SharedSpinlock)
    }

    /// Name as accepted on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Isolated => "isolation",
            Self::Shared => "shared",
            Self::SharedSpinlock => "spinlock",
        }
    }
}

impl fmt::Display for CoordinationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration errors, all detected before any worker starts
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("iteration count must be at least 1")]
    NoIterations,

    #[error("iteration count must be at most {}, got {0}", MAX_ITERATIONS)]
    TooManyIterations(u64),

    #[error("random write ratio must be between 0 and 100, got {0}")]
    WriteRatioOutOfRange(f64),

    #[error("write payload size must be at least 1 byte")]
    EmptyPayload,

    #[error("write payload size must be at most {} bytes, got {0}", MAX_PAYLOAD_BYTES)]
    PayloadTooLarge(usize),

    #[error("hash rounds must be at least 1")]
    NoHashRounds,

    #[error("write path does not exist: {}", .0.display())]
    WriteDirMissing(PathBuf),

    #[error("write path is not a directory: {}", .0.display())]
    WriteDirNotADirectory(PathBuf),

    #[error("invalid CPU core list: {0}")]
    InvalidCpuList(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Validated, immutable run parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkConfig {
    mode: CoordinationMode,
    workers: usize,
    iterations: u64,
    write_ratio: f64,
    write_dir: PathBuf,
    payload_bytes: usize,
    hash_rounds: usize,
    cpu_cores: Option<Vec<usize>>,
}

impl BenchmarkConfig {
    /// Validate raw parameters into a config
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any parameter is out of range or the write
    /// directory does not exist.
    pub fn new(
        mode: CoordinationMode,
        workers: usize,
        iterations: u64,
        write_ratio: f64,
        write_dir: impl Into<PathBuf>,
        payload_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            mode,
            workers,
            iterations,
            write_ratio,
            write_dir: write_dir.into(),
            payload_bytes,
            hash_rounds: DEFAULT_HASH_ROUNDS,
            cpu_cores: None,
        };
        validator::validate_config(&config)?;
        Ok(config)
    }

    /// Override the number of hash rounds per work unit
    pub fn with_hash_rounds(mut self, hash_rounds: usize) -> Result<Self, ConfigError> {
        validator::validate_hash_rounds(hash_rounds)?;
        self.hash_rounds = hash_rounds;
        Ok(self)
    }

    /// Pin workers round-robin onto the given CPU cores
    pub fn with_cpu_cores(mut self, cores: Vec<usize>) -> Result<Self, ConfigError> {
        validator::validate_cpu_cores(&cores)?;
        self.cpu_cores = Some(cores);
        Ok(self)
    }

    pub fn mode(&self) -> CoordinationMode {
        self.mode
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Write probability in percent, within [0, 100]
    pub fn write_ratio(&self) -> f64 {
        self.write_ratio
    }

    pub fn write_dir(&self) -> &Path {
        &self.write_dir
    }

    pub fn payload_bytes(&self) -> usize {
        self.payload_bytes
    }

    pub fn hash_rounds(&self) -> usize {
        self.hash_rounds
    }

    pub fn cpu_cores(&self) -> Option<&[usize]> {
        self.cpu_cores.as_deref()
    }

    /// Scratch file owned by the given worker
    pub fn worker_file(&self, worker_id: usize) -> PathBuf {
        self.write_dir.join(worker_id.to_string())
    }

    /// Total work units the run will execute if no worker fails
    pub fn total_units(&self) -> u64 {
        (self.workers as u64).saturating_mul(self.iterations)
    }
}

impl fmt::Display for BenchmarkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode={}, workers={}, iterations={}, write_ratio={}%, dir={}, payload={} bytes, hash_rounds={}",
            self.mode,
            self.workers,
            self.iterations,
            self.write_ratio,
            self.write_dir.display(),
            self.payload_bytes,
            self.hash_rounds
        )?;
        if let Some(ref cores) = self.cpu_cores {
            write!(f, ", cpu_cores={:?}", cores)?;
        }
        Ok(())
    }
}
