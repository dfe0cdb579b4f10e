//! CLI argument parsing using clap

use super::{CoordinationMode, DEFAULT_WORKERS, ENV_NUM_THREADS};
use clap::Parser;
use std::path::PathBuf;

const EXAMPLES: &str = "\
Examples:
  # 16 workers, 1000000 iterations each, no interaction between workers,
  # 20% of iterations overwrite 1KB in /tmp
  NUM_THREADS=16 stresspulse isolation 1000000 20 /tmp 1024

  # 16 workers relaying result tokens, 30% writes of 2KB in /mnt/resource
  NUM_THREADS=16 stresspulse shared 1000000 30 /mnt/resource 2048

  # token relay plus a contended spin lock, pinned to the first 12 cores
  stresspulse spinlock 1000000 90 /tmp 2048 --threads 16 --cpu-cores 0-11

Note: a random write ratio of 100 writes on every iteration.";

/// StressPulse - CPU and disk-IO stress generator
#[derive(Parser, Debug)]
#[command(name = "stresspulse")]
#[command(version, about, long_about = None, after_help = EXAMPLES)]
pub struct Cli {
    /// Coordination mode between workers
    #[arg(value_enum, value_name = "MODE")]
    pub mode: Option<CoordinationMode>,

    /// Number of iterations per worker
    #[arg(value_name = "ITERATIONS")]
    pub iterations: Option<u64>,

    /// Probability (percent, 0-100) that an iteration writes the payload
    #[arg(value_name = "RANDOM_WRITE_RATIO")]
    pub write_ratio: Option<f64>,

    /// Existing directory that receives one scratch file per worker
    #[arg(value_name = "PATH")]
    pub write_dir: Option<PathBuf>,

    /// Size of the payload written on each write, in bytes
    #[arg(value_name = "BYTES")]
    pub payload_bytes: Option<usize>,

    /// Number of worker threads (invalid values fall back to the default of 2)
    #[arg(short = 't', long, env = ENV_NUM_THREADS, value_name = "N")]
    pub threads: Option<String>,

    /// Hash rounds per iteration
    #[arg(long, value_name = "N")]
    pub hash_rounds: Option<usize>,

    /// CPU cores to pin workers to, round-robin (e.g. "0,2-4")
    #[arg(long, value_name = "LIST")]
    pub cpu_cores: Option<String>,

    /// Print a progress line every N seconds
    #[arg(long, value_name = "SECS")]
    pub live_interval: Option<u64>,

    /// Verify every written scratch file after the run
    #[arg(long)]
    pub verify: bool,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Dry run - validate configuration without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments that clap cannot check on its own
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.config.is_none() {
            let missing: Vec<&str> = [
                ("MODE", self.mode.is_none()),
                ("ITERATIONS", self.iterations.is_none()),
                ("RANDOM_WRITE_RATIO", self.write_ratio.is_none()),
                ("PATH", self.write_dir.is_none()),
                ("BYTES", self.payload_bytes.is_none()),
            ]
            .iter()
            .filter(|(_, absent)| *absent)
            .map(|(name, _)| *name)
            .collect();

            if !missing.is_empty() {
                anyhow::bail!(
                    "missing arguments: {} (or pass --config)",
                    missing.join(", ")
                );
            }
        }

        if self.live_interval == Some(0) {
            anyhow::bail!("live_interval must be at least 1 second");
        }

        Ok(())
    }

    /// Worker count from `--threads` or the environment, if it parses
    ///
    /// Returns `None` when nothing was given. An unparsable or zero value is
    /// reported and replaced with [`DEFAULT_WORKERS`].
    pub fn workers(&self) -> Option<usize> {
        self.threads.as_deref().map(resolve_workers)
    }
}

/// Parse a worker count leniently
///
/// Only positive integers are accepted; anything else falls back to the
/// default, matching how the `NUM_THREADS` variable has always behaved.
pub fn resolve_workers(raw: &str) -> usize {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => {
            log::warn!(
                "ignoring invalid worker count {:?} (--threads or {}), using {}",
                raw,
                ENV_NUM_THREADS,
                DEFAULT_WORKERS
            );
            DEFAULT_WORKERS
        }
    }
}
