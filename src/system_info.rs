use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::thread::sleep;
use sysinfo::System;

use crate::error::MetricError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os_name: String,
    pub kernel_version: String,
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub memory_percent: f32,
}

pub fn get_system_info() -> Result<SystemInfo, MetricError> {
    let os_name = System::long_os_version()
        .or_else(System::name)
        .ok_or_else(|| MetricError::unavailable("os", "distribution unknown"))?;
    let kernel_version = System::kernel_version()
        .ok_or_else(|| MetricError::unavailable("os", "kernel release unknown"))?;
    Ok(SystemInfo {
        os_name,
        kernel_version,
        hostname: host_name(),
    })
}

pub fn host_name() -> String {
    System::host_name().unwrap_or_else(|| "unknown".to_string())
}

pub trait ProcessSource {
    /// Take the baseline CPU reading. Called before the sampling window opens.
    fn prime(&mut self);

    fn snapshot(&mut self) -> Result<Vec<ProcessInfo>, MetricError>;
}

pub struct SystemMonitor {
    system: System,
    primed: bool,
}

impl SystemMonitor {
    pub fn new() -> Self {
        SystemMonitor {
            system: System::new(),
            primed: false,
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SystemMonitor {
    fn prime(&mut self) {
        self.system.refresh_memory();
        self.system.refresh_processes();
        self.primed = true;
    }

    fn snapshot(&mut self) -> Result<Vec<ProcessInfo>, MetricError> {
        if !self.primed {
            self.prime();
            sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        }
        self.system.refresh_processes();

        let total_memory = self.system.total_memory();
        let processes = without_threads(self.system.processes().iter().map(|(pid, process)| {
            let memory_bytes = process.memory();
            let memory_percent = if total_memory > 0 {
                (memory_bytes as f64 / total_memory as f64 * 100.0) as f32
            } else {
                0.0
            };
            let info = ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                cpu_percent: process.cpu_usage(),
                memory_bytes,
                memory_percent,
            };
            (info, process.thread_kind().is_some())
        }));

        if processes.is_empty() {
            return Err(MetricError::unavailable("processes", "process table empty"));
        }
        Ok(processes)
    }
}

/// sysinfo lists every task of a process on Linux; threads share their
/// leader's memory and would crowd the rankings with one program.
fn without_threads<I>(entries: I) -> Vec<ProcessInfo>
where
    I: IntoIterator<Item = (ProcessInfo, bool)>,
{
    entries
        .into_iter()
        .filter_map(|(info, is_thread)| (!is_thread).then_some(info))
        .collect()
}

fn rank_by<F>(processes: &[ProcessInfo], limit: usize, key: F) -> Vec<ProcessInfo>
where
    F: Fn(&ProcessInfo) -> f32,
{
    let mut ranked = processes.to_vec();
    ranked.sort_by(|a, b| match key(b).total_cmp(&key(a)) {
        Ordering::Equal => a.pid.cmp(&b.pid),
        other => other,
    });
    ranked.truncate(limit);
    ranked
}

pub fn top_by_cpu(processes: &[ProcessInfo], limit: usize) -> Vec<ProcessInfo> {
    rank_by(processes, limit, |p| p.cpu_percent)
}

pub fn top_by_memory(processes: &[ProcessInfo], limit: usize) -> Vec<ProcessInfo> {
    rank_by(processes, limit, |p| p.memory_percent)
}
