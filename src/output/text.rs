//! Human-readable text output

use crate::config::BenchmarkConfig;
use crate::stats::RunReport;
use crate::util::time::{format_duration, percent};

/// Configuration banner, one setting per line
pub fn format_configuration(config: &BenchmarkConfig) -> String {
    let mut lines = vec![
        format!("Mode = {}", config.mode()),
        format!("Num of threads = {}", config.workers()),
        format!("Iterations = {}", format_number(config.iterations())),
        format!("RandomWriteRatio = {}%", config.write_ratio()),
        format!("Write I/O Dir = {}", config.write_dir().display()),
        format!("Write I/O with Size = {}", format_bytes(config.payload_bytes() as u64)),
        format!("Hash rounds = {}", config.hash_rounds()),
    ];

    if let Some(cores) = config.cpu_cores() {
        lines.push(format!("CPU cores = {:?}", cores));
    }

    if config.mode().uses_token_ring() {
        let state = if config.mode().uses_spinlock() {
            "Enabled"
        } else {
            "Disabled"
        };
        lines.push(format!("SpinLock: {}", state));
    }

    lines.join("\n")
}

/// Print the configuration banner to console
pub fn print_configuration(config: &BenchmarkConfig) {
    println!("{}", format_configuration(config));
    println!();
}

/// Result lines for a finished run
///
/// Workers that could not run are reported on the log, not here.
pub fn format_results(report: &RunReport) -> String {
    let mut lines = vec![
        format!("Time elapsed: {}", format_duration(report.elapsed())),
        format!(
            "Work units: {}",
            format_number(report.total_iterations())
        ),
        format!(
            "Writes: {} ({:.2}% of units)",
            format_number(report.total_writes()),
            percent(report.total_writes(), report.total_iterations())
        ),
    ];

    if report.total_write_errors() > 0 {
        lines.push(format!(
            "Write errors: {}",
            format_number(report.total_write_errors())
        ));
    }

    if let Some(cpu) = report.cpu {
        lines.push(format!(
            "CPU: {:.0}% ({:.1}% user)",
            cpu.cpu_percent, cpu.user_percent
        ));
    }

    lines.join("\n")
}

/// Print run results to console
pub fn print_results(report: &RunReport) {
    println!("{}", format_results(report));
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

/// Format bytes with appropriate units
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinationMode;
    use crate::stats::WorkerStats;
    use crate::util::resource::CpuUsage;
    use std::time::Duration;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(16 * 1024), "16.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 / 2), "1.50 MB");
    }

    #[test]
    fn test_configuration_spinlock_line() {
        let dir = tempfile::tempdir().unwrap();

        let isolated =
            BenchmarkConfig::new(CoordinationMode::Isolated, 2, 10, 5.0, dir.path(), 16384)
                .unwrap();
        let text = format_configuration(&isolated);
        assert!(text.contains("Num of threads = 2"));
        assert!(text.contains("RandomWriteRatio = 5%"));
        assert!(text.contains("Write I/O with Size = 16.00 KB"));
        assert!(!text.contains("SpinLock"));

        let shared =
            BenchmarkConfig::new(CoordinationMode::Shared, 2, 10, 5.0, dir.path(), 16384).unwrap();
        assert!(format_configuration(&shared).contains("SpinLock: Disabled"));

        let spin =
            BenchmarkConfig::new(CoordinationMode::SharedSpinlock, 2, 10, 5.0, dir.path(), 16384)
                .unwrap();
        assert!(format_configuration(&spin).contains("SpinLock: Enabled"));
    }

    #[test]
    fn test_results_clean_run() {
        let mut worker = WorkerStats::new(0);
        worker.iterations = 1500;
        worker.writes = 75;

        let report = RunReport {
            mode: CoordinationMode::Isolated,
            elapsed: Duration::from_millis(250),
            workers: vec![worker],
            cpu: None,
        };

        let text = format_results(&report);
        assert!(text.starts_with("Time elapsed: 250.00ms"));
        assert!(text.contains("Work units: 1,500"));
        assert!(text.contains("Writes: 75 (5.00% of units)"));
        assert!(!text.contains("Failed workers"));
        assert!(!text.contains("Write errors"));
        assert!(!text.contains("CPU"));
    }

    #[test]
    fn test_results_same_with_failed_worker() {
        let mut a = WorkerStats::new(0);
        a.iterations = 10;
        let mut b = a.clone();
        b.worker_id = 1;

        let clean = RunReport {
            mode: CoordinationMode::Isolated,
            elapsed: Duration::from_secs(1),
            workers: vec![a.clone(), b],
            cpu: None,
        };
        let partial = RunReport {
            workers: vec![a, WorkerStats::failed(1, "is a directory")],
            ..clean.clone()
        };

        let clean_text = format_results(&clean);
        let partial_text = format_results(&partial);
        assert_eq!(partial.failed_workers(), 1);
        assert!(!partial_text.contains("Failed"));
        assert!(!partial_text.contains("failed"));
        assert_eq!(clean_text.lines().count(), partial_text.lines().count());
        assert_eq!(clean_text.lines().next(), partial_text.lines().next());
    }

    #[test]
    fn test_results_show_cpu() {
        let report = RunReport {
            mode: CoordinationMode::Shared,
            elapsed: Duration::from_secs(2),
            workers: vec![WorkerStats::new(0), WorkerStats::failed(1, "no such file")],
            cpu: Some(CpuUsage {
                cpu_percent: 99.6,
                user_percent: 90.0,
            }),
        };

        let text = format_results(&report);
        assert!(!text.contains("Failed workers"));
        assert!(text.contains("CPU: 100% (90.0% user)"));
    }
}
