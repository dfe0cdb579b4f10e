//! Configuration validation

use super::*;
use crate::worker::affinity;

/// Validate complete configuration
pub fn validate_config(config: &BenchmarkConfig) -> Result<(), ConfigError> {
    validate_workers(config.workers)?;
    validate_iterations(config.iterations)?;
    validate_write_ratio(config.write_ratio)?;
    validate_write_dir(&config.write_dir)?;
    validate_payload_bytes(config.payload_bytes)?;
    validate_hash_rounds(config.hash_rounds)?;

    if let Some(ref cores) = config.cpu_cores {
        validate_cpu_cores(cores)?;
    }

    Ok(())
}

pub fn validate_workers(workers: usize) -> Result<(), ConfigError> {
    if workers == 0 {
        return Err(ConfigError::NoWorkers);
    }
    Ok(())
}

pub fn validate_iterations(iterations: u64) -> Result<(), ConfigError> {
    if iterations == 0 {
        return Err(ConfigError::NoIterations);
    }
    if iterations > MAX_ITERATIONS {
        return Err(ConfigError::TooManyIterations(iterations));
    }
    Ok(())
}

/// Ratio is a percentage; NaN and infinities are rejected along with
/// anything outside [0, 100]
pub fn validate_write_ratio(ratio: f64) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&ratio) {
        return Err(ConfigError::WriteRatioOutOfRange(ratio));
    }
    Ok(())
}

pub fn validate_write_dir(path: &Path) -> Result<(), ConfigError> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ConfigError::WriteDirNotADirectory(path.to_path_buf())),
        Err(_) => Err(ConfigError::WriteDirMissing(path.to_path_buf())),
    }
}

pub fn validate_payload_bytes(bytes: usize) -> Result<(), ConfigError> {
    if bytes == 0 {
        return Err(ConfigError::EmptyPayload);
    }
    if bytes > MAX_PAYLOAD_BYTES {
        return Err(ConfigError::PayloadTooLarge(bytes));
    }
    Ok(())
}

pub fn validate_hash_rounds(rounds: usize) -> Result<(), ConfigError> {
    if rounds == 0 {
        return Err(ConfigError::NoHashRounds);
    }
    Ok(())
}

pub fn validate_cpu_cores(cores: &[usize]) -> Result<(), ConfigError> {
    if cores.is_empty() {
        return Err(ConfigError::InvalidCpuList("list is empty".to_string()));
    }
    if let Some(&core) = cores.iter().find(|&&core| core >= affinity::MAX_CPU_ID) {
        return Err(ConfigError::InvalidCpuList(format!(
            "core {} is too large (max {})",
            core,
            affinity::MAX_CPU_ID - 1
        )));
    }
    Ok(())
}

/// Non-fatal checks, reported as warnings
///
/// Returns the number of warnings emitted.
pub fn warn_config(config: &BenchmarkConfig) -> usize {
    let mut warnings = 0;

    if affinity::warn_if_oversubscribed(config.workers) {
        warnings += 1;
    }

    if let Some(cores) = config.cpu_cores() {
        let available = affinity::num_cpus();
        if let Some(&core) = cores.iter().find(|&&core| core >= available) {
            log::warn!(
                "CPU core {} is beyond the {} cores reported by the system; pinning may fail",
                core,
                available
            );
            warnings += 1;
        }
    }

    if config.mode().uses_token_ring() && config.workers == 1 {
        log::info!("single worker in {} mode runs sequentially", config.mode());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_workers() {
        assert!(validate_workers(1).is_ok());
        assert!(matches!(validate_workers(0), Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn test_validate_iterations() {
        assert!(validate_iterations(1).is_ok());
        assert!(validate_iterations(1_000_000).is_ok());
        assert!(matches!(validate_iterations(0), Err(ConfigError::NoIterations)));
        assert!(validate_iterations(MAX_ITERATIONS).is_ok());
        assert!(matches!(
            validate_iterations(MAX_ITERATIONS + 1),
            Err(ConfigError::TooManyIterations(_))
        ));
        assert!(matches!(
            validate_iterations(u64::MAX / 2),
            Err(ConfigError::TooManyIterations(_))
        ));
    }

    #[test]
    fn test_validate_write_ratio() {
        assert!(validate_write_ratio(0.0).is_ok());
        assert!(validate_write_ratio(42.5).is_ok());
        assert!(validate_write_ratio(100.0).is_ok());

        assert!(validate_write_ratio(-0.1).is_err());
        assert!(validate_write_ratio(100.01).is_err());
        assert!(validate_write_ratio(f64::NAN).is_err());
        assert!(validate_write_ratio(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_write_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_write_dir(dir.path()).is_ok());

        let missing = dir.path().join("does-not-exist");
        assert!(matches!(
            validate_write_dir(&missing),
            Err(ConfigError::WriteDirMissing(_))
        ));

        let file = dir.path().join("plain-file");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            validate_write_dir(&file),
            Err(ConfigError::WriteDirNotADirectory(_))
        ));
    }

    #[test]
    fn test_validate_payload_and_rounds() {
        assert!(validate_payload_bytes(1).is_ok());
        assert!(matches!(validate_payload_bytes(0), Err(ConfigError::EmptyPayload)));
        assert!(validate_payload_bytes(MAX_PAYLOAD_BYTES).is_ok());
        assert!(matches!(
            validate_payload_bytes(MAX_PAYLOAD_BYTES + 1),
            Err(ConfigError::PayloadTooLarge(_))
        ));
        assert!(validate_hash_rounds(128).is_ok());
        assert!(matches!(validate_hash_rounds(0), Err(ConfigError::NoHashRounds)));
    }

    #[test]
    fn test_validate_cpu_cores() {
        assert!(validate_cpu_cores(&[0, 1, 2]).is_ok());
        assert!(validate_cpu_cores(&[]).is_err());
        assert!(validate_cpu_cores(&[affinity::MAX_CPU_ID]).is_err());
    }

    #[test]
    fn test_validate_config_reports_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = BenchmarkConfig::new(CoordinationMode::Shared, 0, 0, 200.0, dir.path(), 0)
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoWorkers));
    }

    #[test]
    fn test_new_rejects_unallocatable_payload() {
        let dir = tempfile::tempdir().unwrap();
        let err = BenchmarkConfig::new(CoordinationMode::Isolated, 1, 1, 0.0, dir.path(), usize::MAX)
            .unwrap_err();
        assert!(matches!(err, ConfigError::PayloadTooLarge(usize::MAX)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConfigError::WriteRatioOutOfRange(101.0).to_string(),
            "random write ratio must be between 0 and 100, got 101"
        );
        assert_eq!(
            ConfigError::TooManyIterations(1 << 40).to_string(),
            "iteration count must be at most 2147483647, got 1099511627776"
        );
        assert_eq!(
            ConfigError::Missing("mode").to_string(),
            "missing required setting: mode"
        );
    }
}
