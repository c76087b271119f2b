use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

use log::{debug, warn};

use crate::error::MetricError;

use super::types::MemoryStats;

pub const MEMINFO_SOURCE: &str = "/proc/meminfo";
pub const FREE_SOURCE: &str = "free -k";

pub trait MemorySource {
    fn read_memory(&mut self) -> Result<MemoryStats, MetricError>;
}

/// `MemTotal` / `MemAvailable` in kB as read from a meminfo file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub available_kb: Option<u64>,
}

pub fn parse_meminfo(content: &str) -> Result<MemInfo, MetricError> {
    let mut total_kb = None;
    let mut available_kb = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("MemTotal:") => total_kb = parts.next().and_then(|v| v.parse::<u64>().ok()),
            Some("MemAvailable:") => {
                available_kb = parts.next().and_then(|v| v.parse::<u64>().ok())
            }
            _ => {}
        }
    }

    let total_kb =
        total_kb.ok_or_else(|| MetricError::unavailable("memory", "MemTotal missing"))?;
    Ok(MemInfo {
        total_kb,
        available_kb,
    })
}

/// Parse `free -k`: locate the `total` and `available` columns from the
/// header, then read them from the `Mem:` row.
pub fn parse_free_output(output: &str) -> Result<(u64, u64), MetricError> {
    let mut lines = output.lines();
    let header: Vec<&str> = lines
        .next()
        .map(|line| line.split_whitespace().collect())
        .unwrap_or_default();
    let mem_row: Vec<&str> = lines
        .find(|line| line.trim_start().starts_with("Mem:"))
        .map(|line| line.split_whitespace().collect())
        .ok_or_else(|| MetricError::unavailable("memory", "free output has no Mem: row"))?;

    // header has no label column, so header[i] maps to mem_row[i + 1]
    let column = |name: &str| -> Result<u64, MetricError> {
        let idx = header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| MetricError::unavailable("memory", format!("free lacks `{}`", name)))?;
        mem_row
            .get(idx + 1)
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| MetricError::unavailable("memory", format!("bad `{}` value", name)))
    };

    Ok((column("total")?, column("available")?))
}

/// `/proc/meminfo` first; `free -k` fills whatever it cannot provide.
pub struct MemInfoSource {
    meminfo_path: PathBuf,
    free_command: String,
}

impl MemInfoSource {
    pub fn new(meminfo_path: impl Into<PathBuf>) -> Self {
        MemInfoSource {
            meminfo_path: meminfo_path.into(),
            free_command: "free".to_string(),
        }
    }

    pub fn with_free_command(mut self, command: impl Into<String>) -> Self {
        self.free_command = command.into();
        self
    }

    fn run_free(&self) -> Result<(u64, u64), MetricError> {
        let output = Command::new(&self.free_command)
            .arg("-k")
            .output()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => MetricError::tool_missing(&self.free_command),
                _ => MetricError::unavailable(
                    "memory",
                    format!("failed to execute {}: {}", self.free_command, err),
                ),
            })?;

        if !output.status.success() {
            return Err(MetricError::unavailable(
                "memory",
                format!("{} exited with {}", self.free_command, output.status),
            ));
        }

        parse_free_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl MemorySource for MemInfoSource {
    fn read_memory(&mut self) -> Result<MemoryStats, MetricError> {
        let meminfo = fs::read_to_string(&self.meminfo_path)
            .map_err(|err| {
                MetricError::unavailable(
                    "memory",
                    format!("{}: {}", self.meminfo_path.display(), err),
                )
            })
            .and_then(|content| parse_meminfo(&content));

        match meminfo {
            Ok(MemInfo {
                total_kb,
                available_kb: Some(available_kb),
            }) => Ok(MemoryStats::from_kib(total_kb, available_kb, MEMINFO_SOURCE)),
            Ok(MemInfo {
                total_kb,
                available_kb: None,
            }) => {
                debug!("MemAvailable missing; asking {} for it", self.free_command);
                let (_, available_kb) = self.run_free().map_err(|err| {
                    MetricError::unavailable("memory", format!("fallback failed: {}", err))
                })?;
                Ok(MemoryStats::from_kib(total_kb, available_kb, FREE_SOURCE))
            }
            Err(err) => {
                warn!("meminfo reader failed: {}. Falling back to {}", err, FREE_SOURCE);
                let (total_kb, available_kb) = self.run_free().map_err(|fallback| {
                    MetricError::unavailable(
                        "memory",
                        format!("{}; fallback failed: {}", err, fallback),
                    )
                })?;
                Ok(MemoryStats::from_kib(total_kb, available_kb, FREE_SOURCE))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MEMINFO: &str = "\
MemTotal:        8000000 kB
MemFree:          500000 kB
MemAvailable:    2000000 kB
Buffers:          100000 kB
Cached:          1200000 kB
";

    const FREE_OUTPUT: &str = "\
               total        used        free      shared  buff/cache   available
Mem:         8000000     5500000      500000       10000     2000000     2000000
Swap:        2097148           0     2097148
";

    #[test]
    fn meminfo_yields_available_based_usage() {
        let info = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(info.total_kb, 8_000_000);
        assert_eq!(info.available_kb, Some(2_000_000));

        let stats = MemoryStats::from_kib(info.total_kb, 2_000_000, MEMINFO_SOURCE);
        assert_eq!(stats.used_bytes, 6_144_000_000);
        assert_eq!(format!("{:.1}", stats.used_percent), "75.0");
    }

    #[test]
    fn meminfo_without_total_is_unavailable() {
        assert!(parse_meminfo("MemFree: 10 kB\n").is_err());
    }

    #[test]
    fn free_output_columns_are_located_by_header() {
        assert_eq!(parse_free_output(FREE_OUTPUT).unwrap(), (8_000_000, 2_000_000));
    }

    #[test]
    fn free_without_available_column_is_rejected() {
        let old = "             total       used       free     shared    buffers     cached\n\
Mem:       8000000    7500000     500000          0     100000    1200000\n";
        assert!(parse_free_output(old).is_err());
    }

    #[test]
    fn reads_meminfo_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meminfo");
        fs::write(&path, MEMINFO).unwrap();

        let stats = MemInfoSource::new(&path).read_memory().unwrap();
        assert_eq!(stats.total_bytes, 8_192_000_000);
        assert_eq!(stats.available_bytes, 2_048_000_000);
        assert_eq!(stats.source, MEMINFO_SOURCE);
    }

    /// Writes a `free` stand-in that prints `FREE_OUTPUT`.
    #[cfg(unix)]
    fn scripted_free(dir: &TempDir) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("free");
        fs::write(&path, format!("#!/bin/sh\ncat <<'EOF'\n{}EOF\n", FREE_OUTPUT)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn old_kernel_takes_available_from_free() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meminfo");
        fs::write(&path, "MemTotal:        4000000 kB\nMemFree:          300000 kB\n").unwrap();

        let stats = MemInfoSource::new(&path)
            .with_free_command(scripted_free(&dir))
            .read_memory()
            .unwrap();
        assert_eq!(stats.source, FREE_SOURCE);
        assert_eq!(stats.total_bytes, 4_096_000_000);
        assert_eq!(stats.available_bytes, 2_048_000_000);
        assert_eq!(format!("{:.1}", stats.used_percent), "50.0");
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_meminfo_falls_back_to_free() {
        let dir = TempDir::new().unwrap();

        let stats = MemInfoSource::new(dir.path().join("meminfo"))
            .with_free_command(scripted_free(&dir))
            .read_memory()
            .unwrap();
        assert_eq!(stats.source, FREE_SOURCE);
        assert_eq!(stats.total_bytes, 8_192_000_000);
        assert_eq!(stats.available_bytes, 2_048_000_000);
        assert_eq!(stats.used_bytes, 6_144_000_000);
    }

    #[test]
    fn missing_meminfo_and_missing_tool_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut source = MemInfoSource::new(dir.path().join("meminfo"))
            .with_free_command("server-stats-test-no-such-free");
        let err = source.read_memory().unwrap_err();
        assert!(matches!(err, MetricError::MetricUnavailable { .. }));
    }
}
