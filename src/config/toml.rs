//! TOML configuration file parsing
//!
//! A config file carries a single `[benchmark]` table:
//!
//! ```toml
//! [benchmark]
//! mode = "spinlock"
//! workers = 8
//! iterations = 100000
//! write_ratio = 25.0
//! write_dir = "/mnt/scratch"
//! payload_bytes = 4096
//! hash_rounds = 128
//! cpu_cores = "0-7"
//! ```
//!
//! Every field is optional in the file. Values given on the command line take
//! precedence, then the file, then the built-in defaults. `mode` and
//! `write_dir` have no default.

use super::cli::Cli;
use super::*;
use crate::worker::affinity::parse_cpu_list;
use anyhow::{Context, Result};
use std::fs;

/// Top-level layout of a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub benchmark: BenchmarkSettings,
}

/// Unvalidated benchmark settings, as read from a file or the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkSettings {
    pub mode: Option<CoordinationMode>,
    pub workers: Option<usize>,
    pub iterations: Option<u64>,
    pub write_ratio: Option<f64>,
    pub write_dir: Option<PathBuf>,
    pub payload_bytes: Option<usize>,
    pub hash_rounds: Option<usize>,
    pub cpu_cores: Option<String>,
}

impl BenchmarkSettings {
    /// Settings given explicitly on the command line
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            mode: cli.mode,
            workers: cli.workers(),
            iterations: cli.iterations,
            write_ratio: cli.write_ratio,
            write_dir: cli.write_dir.clone(),
            payload_bytes: cli.payload_bytes,
            hash_rounds: cli.hash_rounds,
            cpu_cores: cli.cpu_cores.clone(),
        }
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win
    pub fn merge(self, overrides: BenchmarkSettings) -> Self {
        Self {
            mode: overrides.mode.or(self.mode),
            workers: overrides.workers.or(self.workers),
            iterations: overrides.iterations.or(self.iterations),
            write_ratio: overrides.write_ratio.or(self.write_ratio),
            write_dir: overrides.write_dir.or(self.write_dir),
            payload_bytes: overrides.payload_bytes.or(self.payload_bytes),
            hash_rounds: overrides.hash_rounds.or(self.hash_rounds),
            cpu_cores: overrides.cpu_cores.or(self.cpu_cores),
        }
    }

    /// Fill defaults and validate
    pub fn into_config(self) -> std::result::Result<BenchmarkConfig, ConfigError> {
        let mode = self.mode.ok_or(ConfigError::Missing("mode"))?;
        let write_dir = self.write_dir.ok_or(ConfigError::Missing("write_dir"))?;

        let mut config = BenchmarkConfig::new(
            mode,
            self.workers.unwrap_or(DEFAULT_WORKERS),
            self.iterations.unwrap_or(DEFAULT_ITERATIONS),
            self.write_ratio.unwrap_or(DEFAULT_WRITE_RATIO),
            write_dir,
            self.payload_bytes.unwrap_or(DEFAULT_PAYLOAD_BYTES),
        )?;

        if let Some(rounds) = self.hash_rounds {
            config = config.with_hash_rounds(rounds)?;
        }

        if let Some(ref list) = self.cpu_cores {
            let cores = parse_cpu_list(list)
                .map_err(|e| ConfigError::InvalidCpuList(format!("{:#}", e)))?;
            config = config.with_cpu_cores(cores)?;
        }

        Ok(config)
    }
}

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<ConfigFile> {
    let config: ConfigFile =
        ::toml::from_str(contents).context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Build the run configuration from the CLI and, if given, a config file
/// (CLI takes precedence)
pub fn load_config(cli: &Cli) -> Result<BenchmarkConfig> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?.benchmark,
        None => BenchmarkSettings::default(),
    };

    let settings = base.merge(BenchmarkSettings::from_cli(cli));
    let config = settings.into_config()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_toml_basic() {
        let toml = r#"
[benchmark]
mode = "shared"
workers = 4
iterations = 500
write_ratio = 12.5
write_dir = "/tmp"
payload_bytes = 2048
"#;

        let file = parse_toml_string(toml).unwrap();
        let b = file.benchmark;
        assert_eq!(b.mode, Some(CoordinationMode::Shared));
        assert_eq!(b.workers, Some(4));
        assert_eq!(b.iterations, Some(500));
        assert_eq!(b.write_ratio, Some(12.5));
        assert_eq!(b.write_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(b.payload_bytes, Some(2048));
        assert_eq!(b.hash_rounds, None);
    }

    #[test]
    fn test_parse_toml_mode_names() {
        let file = parse_toml_string("[benchmark]\nmode = \"spinlock\"\n").unwrap();
        assert_eq!(file.benchmark.mode, Some(CoordinationMode::SharedSpinlock));

        let file = parse_toml_string("[benchmark]\nmode = \"isolated\"\n").unwrap();
        assert_eq!(file.benchmark.mode, Some(CoordinationMode::Isolated));

        assert!(parse_toml_string("[benchmark]\nmode = \"parallel\"\n").is_err());
    }

    #[test]
    fn test_parse_toml_rejects_unknown_fields() {
        assert!(parse_toml_string("[benchmark]\nqueue_depth = 32\n").is_err());
    }

    #[test]
    fn test_into_config_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = BenchmarkSettings {
            mode: Some(CoordinationMode::Isolated),
            write_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = settings.into_config().unwrap();
        assert_eq!(config.workers(), DEFAULT_WORKERS);
        assert_eq!(config.iterations(), DEFAULT_ITERATIONS);
        assert_eq!(config.write_ratio(), DEFAULT_WRITE_RATIO);
        assert_eq!(config.payload_bytes(), DEFAULT_PAYLOAD_BYTES);
        assert_eq!(config.hash_rounds(), DEFAULT_HASH_ROUNDS);
    }

    #[test]
    fn test_into_config_requires_mode_and_dir() {
        let err = BenchmarkSettings::default().into_config().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("mode")));

        let settings = BenchmarkSettings {
            mode: Some(CoordinationMode::Shared),
            ..Default::default()
        };
        assert!(matches!(
            settings.into_config(),
            Err(ConfigError::Missing("write_dir"))
        ));
    }

    #[test]
    fn test_into_config_cpu_cores() {
        let dir = tempfile::tempdir().unwrap();
        let settings = BenchmarkSettings {
            mode: Some(CoordinationMode::Shared),
            write_dir: Some(dir.path().to_path_buf()),
            cpu_cores: Some("0,2-3".to_string()),
            ..Default::default()
        };
        let config = settings.into_config().unwrap();
        assert_eq!(config.cpu_cores(), Some(&[0, 2, 3][..]));

        let settings = BenchmarkSettings {
            mode: Some(CoordinationMode::Shared),
            write_dir: Some(dir.path().to_path_buf()),
            cpu_cores: Some("3-1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            settings.into_config(),
            Err(ConfigError::InvalidCpuList(_))
        ));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let file = BenchmarkSettings {
            mode: Some(CoordinationMode::Isolated),
            workers: Some(8),
            iterations: Some(10),
            ..Default::default()
        };
        let cli = BenchmarkSettings {
            mode: Some(CoordinationMode::SharedSpinlock),
            iterations: None,
            ..Default::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.mode, Some(CoordinationMode::SharedSpinlock));
        assert_eq!(merged.workers, Some(8));
        assert_eq!(merged.iterations, Some(10));
    }

    #[test]
    fn test_load_config_from_file_with_cli_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(
            &path,
            format!(
                "[benchmark]\nmode = \"shared\"\nworkers = 3\niterations = 50\nwrite_dir = {:?}\n",
                dir.path().display().to_string()
            ),
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "stresspulse",
            "--config",
            path.to_str().unwrap(),
            "--hash-rounds",
            "16",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.mode(), CoordinationMode::Shared);
        assert_eq!(config.iterations(), 50);
        assert_eq!(config.hash_rounds(), 16);
        assert_eq!(config.write_dir(), dir.path());
    }
}
