//! Process CPU utilization tracking
//!
//! Reads user and system CPU time from /proc/self/stat on Linux so a run can
//! report how much CPU it actually burned alongside its wall-clock time.
//! On other platforms snapshots are unavailable and callers get `None`.

use std::fs;
use std::time::Instant;

/// CPU time consumed by this process at one instant
#[derive(Debug, Clone, Copy)]
pub struct CpuSnapshot {
    /// CPU time in user mode (microseconds)
    pub cpu_user_us: u64,
    /// CPU time in kernel mode (microseconds)
    pub cpu_system_us: u64,
    /// Wall-clock time when snapshot was taken
    pub timestamp: Instant,
}

/// CPU utilization over an interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuUsage {
    /// 100.0 per fully busy core (e.g. 350.0 = three and a half cores)
    pub cpu_percent: f64,
    /// User share of the consumed CPU time, in percent
    pub user_percent: f64,
}

impl CpuSnapshot {
    /// Take a snapshot of the current process CPU time
    ///
    /// Returns None if /proc/self/stat cannot be read or parsed.
    pub fn take() -> Option<Self> {
        let (cpu_user_us, cpu_system_us) = Self::read_cpu_time()?;
        Some(Self {
            cpu_user_us,
            cpu_system_us,
            timestamp: Instant::now(),
        })
    }

    /// Total CPU time (user + system) in microseconds
    pub fn total_us(&self) -> u64 {
        self.cpu_user_us + self.cpu_system_us
    }

    /// Read (user_us, system_us) from /proc/self/stat
    fn read_cpu_time() -> Option<(u64, u64)> {
        let stat = fs::read_to_string("/proc/self/stat").ok()?;
        parse_stat_cpu_ticks(&stat).map(|(utime, stime)| {
            let ticks_per_sec = clock_ticks_per_sec();
            (
                utime * 1_000_000 / ticks_per_sec,
                stime * 1_000_000 / ticks_per_sec,
            )
        })
    }

    /// CPU utilization between an earlier snapshot and this one
    pub fn usage_since(&self, earlier: &CpuSnapshot) -> CpuUsage {
        let wall_time_us = self.timestamp.duration_since(earlier.timestamp).as_micros() as u64;
        let cpu_time_us = self.total_us().saturating_sub(earlier.total_us());
        let user_time_us = self.cpu_user_us.saturating_sub(earlier.cpu_user_us);

        let cpu_percent = if wall_time_us == 0 {
            0.0
        } else {
            (cpu_time_us as f64 / wall_time_us as f64) * 100.0
        };
        let user_percent = if cpu_time_us == 0 {
            0.0
        } else {
            (user_time_us as f64 / cpu_time_us as f64) * 100.0
        };

        CpuUsage {
            cpu_percent,
            user_percent,
        }
    }
}

/// Extract utime and stime (fields 14 and 15, in clock ticks)
///
/// The command name (field 2) is parenthesized and may contain spaces, so
/// fields are counted from the last closing parenthesis.
fn parse_stat_cpu_ticks(stat: &str) -> Option<(u64, u64)> {
    let after_comm = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = after_comm.split_whitespace().collect();

    // after_comm starts at field 3 (state), so utime is index 11
    let utime = fields.get(11)?.parse().ok()?;
    let stime = fields.get(12)?.parse().ok()?;
    Some((utime, stime))
}

#[cfg(unix)]
fn clock_ticks_per_sec() -> u64 {
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as u64
    } else {
        100
    }
}

#[cfg(not(unix))]
fn clock_ticks_per_sec() -> u64 {
    100
}
