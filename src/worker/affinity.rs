//! CPU affinity binding
//!
//! Pins worker threads to CPU cores so a run can be confined to a known set
//! of execution contexts without touching process-wide state. Each worker
//! pins only itself, from inside its own thread.
//!
//! # Platform Support
//!
//! CPU affinity is supported on Linux via `sched_setaffinity`. Elsewhere,
//! pinning returns an error and the worker runs unpinned.
//!
//! # Example
//!
//! ```no_run
//! use stresspulse::worker::affinity::{set_cpu_affinity, parse_cpu_list};
//!
//! // Bind the current thread to CPU cores 0, 2, 4
//! let cores = parse_cpu_list("0,2,4").unwrap();
//! set_cpu_affinity(&cores).unwrap();
//! ```

use crate::Result;
use anyhow::Context;

/// Core IDs must be below this (size of `cpu_set_t` in bits)
pub const MAX_CPU_ID: usize = 1024;

/// Set CPU affinity for the current thread
///
/// # Errors
///
/// Returns an error if the list is empty, a core ID is out of range, or the
/// syscall fails (e.g. the core is offline or outside the cgroup's cpuset).
#[cfg(target_os = "linux")]
pub fn set_cpu_affinity(cores: &[usize]) -> Result<()> {
    use libc::{cpu_set_t, sched_setaffinity, CPU_SET, CPU_ZERO};
    use std::mem;

    if cores.is_empty() {
        anyhow::bail!("CPU core list cannot be empty");
    }

    unsafe {
        let mut cpu_set: cpu_set_t = mem::zeroed();
        CPU_ZERO(&mut cpu_set);

        for &core in cores {
            if core >= MAX_CPU_ID {
                anyhow::bail!("CPU core ID {} is too large (max {})", core, MAX_CPU_ID - 1);
            }
            CPU_SET(core, &mut cpu_set);
        }

        let result = sched_setaffinity(
            0, // 0 = current thread
            mem::size_of::<cpu_set_t>(),
            &cpu_set,
        );

        if result != 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context(format!("Failed to set CPU affinity to cores {:?}", cores));
        }
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_cpu_affinity(_cores: &[usize]) -> Result<()> {
    anyhow::bail!("CPU affinity is only supported on Linux")
}

/// Core a worker is pinned to when workers are spread round-robin
pub fn core_for_worker(cores: &[usize], worker_id: usize) -> Option<usize> {
    if cores.is_empty() {
        return None;
    }
    Some(cores[worker_id % cores.len()])
}

/// Parse a comma-separated list of CPU cores or ranges
///
/// Supports formats like:
/// - "0,1,2,3" - Individual cores
/// - "0-3" - Range of cores
/// - "0,2-4,7" - Mixed individual and ranges
///
/// The result is sorted and free of duplicates.
///
/// # Example
///
/// ```
/// use stresspulse::worker::affinity::parse_cpu_list;
///
/// let cores = parse_cpu_list("0,2-4,7").unwrap();
/// assert_eq!(cores, vec![0, 2, 3, 4, 7]);
/// ```
pub fn parse_cpu_list(list: &str) -> Result<Vec<usize>> {
    let mut cores = Vec::new();

    for part in list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: usize = start
                .trim()
                .parse()
                .with_context(|| format!("Invalid CPU core number: {}", start))?;
            let end: usize = end
                .trim()
                .parse()
                .with_context(|| format!("Invalid CPU core number: {}", end))?;

            if start > end {
                anyhow::bail!("Invalid CPU range: start ({}) > end ({})", start, end);
            }
            if end >= MAX_CPU_ID {
                anyhow::bail!("CPU core {} exceeds maximum {}", end, MAX_CPU_ID - 1);
            }

            cores.extend(start..=end);
        } else {
            let core: usize = part
                .parse()
                .with_context(|| format!("Invalid CPU core number: {}", part))?;
            cores.push(core);
        }
    }

    if cores.is_empty() {
        anyhow::bail!("CPU core list cannot be empty");
    }

    cores.sort_unstable();
    cores.dedup();

    Ok(cores)
}

/// Number of logical CPU cores available on the system
pub fn num_cpus() -> usize {
    num_cpus::get()
}

/// Warn when more workers are configured than there are CPU cores
///
/// Returns true if the worker count exceeds the CPU count.
pub fn warn_if_oversubscribed(worker_count: usize) -> bool {
    let cpu_count = num_cpus();
    if worker_count > cpu_count {
        log::warn!(
            "Worker count ({}) exceeds CPU count ({}); workers will time-share cores",
            worker_count,
            cpu_count
        );
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_list_single() {
        assert_eq!(parse_cpu_list("0").unwrap(), vec![0]);
    }

    #[test]
    fn test_parse_cpu_list_range() {
        assert_eq!(parse_cpu_list("0-3").unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parse_cpu_list_mixed_with_spaces() {
        assert_eq!(parse_cpu_list("0, 2-4, 7").unwrap(), vec![0, 2, 3, 4, 7]);
    }

    #[test]
    fn test_parse_cpu_list_dedup_and_sort() {
        assert_eq!(parse_cpu_list("3,1,1,2-3,0").unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parse_cpu_list_errors() {
        assert!(parse_cpu_list("").is_err());
        assert!(parse_cpu_list(" , ").is_err());
        assert!(parse_cpu_list("0,abc,2").is_err());
        assert!(parse_cpu_list("5-2").is_err());
        assert!(parse_cpu_list("0-2-4").is_err());
        assert!(parse_cpu_list("0-100000000").is_err());
    }

    #[test]
    fn test_core_for_worker_round_robin() {
        let cores = [2, 5, 7];
        assert_eq!(core_for_worker(&cores, 0), Some(2));
        assert_eq!(core_for_worker(&cores, 1), Some(5));
        assert_eq!(core_for_worker(&cores, 2), Some(7));
        assert_eq!(core_for_worker(&cores, 3), Some(2));
        assert_eq!(core_for_worker(&[], 0), None);
    }

    #[test]
    fn test_warn_if_oversubscribed() {
        let cpu_count = num_cpus();
        assert!(cpu_count > 0);
        assert!(!warn_if_oversubscribed(cpu_count));
        assert!(warn_if_oversubscribed(cpu_count + 1));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_set_cpu_affinity_out_of_range() {
        assert!(set_cpu_affinity(&[MAX_CPU_ID]).is_err());
        assert!(set_cpu_affinity(&[]).is_err());
    }
}
