mod format;
mod render;

use std::io::Write;
use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::best_effort::{default_metrics, OptionalMetric};
use crate::config::{OutputFormat, ReportConfig};
use crate::error::ReportError;
use crate::metrics::{
    collect_disk_usage, CounterSource, CpuUsage, DiskSource, DiskUsage, MemInfoSource,
    MemoryStats, MemorySource, ProcStatSource, SampleEnvelope, SysinfoDisks, UtilizationSampler,
};
use crate::system_info::{host_name, top_by_cpu, top_by_memory, ProcessInfo, ProcessSource, SystemMonitor};

pub use format::{format_percent, human_bytes, pct, Palette, Style};
pub use render::{render_error, render_json, render_text};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtraLine {
    pub label: String,
    pub value: SampleEnvelope<String>,
}

/// Everything one run observed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub generated_at: DateTime<Local>,
    pub host: String,
    pub cpu: CpuUsage,
    pub memory: MemoryStats,
    pub disk: DiskUsage,
    pub top_n: usize,
    pub top_cpu: SampleEnvelope<Vec<ProcessInfo>>,
    pub top_memory: SampleEnvelope<Vec<ProcessInfo>>,
    pub extras: Vec<ExtraLine>,
}

/// The readers a report is assembled from.
pub struct Sources {
    pub host: String,
    pub cpu: UtilizationSampler<Box<dyn CounterSource>>,
    pub memory: Box<dyn MemorySource>,
    pub disks: Box<dyn DiskSource>,
    pub processes: Box<dyn ProcessSource>,
    pub optional: Vec<Box<dyn OptionalMetric>>,
}

impl Sources {
    /// Live readers for this host.
    pub fn system(config: &ReportConfig) -> Self {
        let counters: Box<dyn CounterSource> =
            Box::new(ProcStatSource::new(config.proc_path("stat")));
        Sources {
            host: host_name(),
            cpu: UtilizationSampler::with_window(counters, config.sample_window),
            memory: Box::new(MemInfoSource::new(config.proc_path("meminfo"))),
            disks: Box::new(SysinfoDisks),
            processes: Box::new(SystemMonitor::new()),
            optional: default_metrics(config.auth_logs.clone()),
        }
    }
}

/// Run every reader once, in report order. CPU, memory and disk failures
/// abort; everything else degrades to a placeholder.
pub fn collect(sources: &mut Sources, top_n: usize) -> Result<HealthSnapshot, ReportError> {
    let generated_at = Local::now();

    // process CPU% is measured over the same window as the host sample
    sources.processes.prime();
    let open = sources.cpu.begin().map_err(ReportError::Cpu)?;
    sources.cpu.wait(&open);
    let cpu = sources.cpu.finish(open).map_err(ReportError::Cpu)?;

    let memory = sources.memory.read_memory().map_err(ReportError::Memory)?;
    let disk = collect_disk_usage(sources.disks.as_mut()).map_err(ReportError::Disk)?;

    let started = Instant::now();
    let table = sources.processes.snapshot();
    let latency = started.elapsed();
    let (top_cpu, top_memory) = match table {
        Ok(table) => (
            SampleEnvelope::fresh(top_by_cpu(&table, top_n), Utc::now(), latency, "sysinfo::processes"),
            SampleEnvelope::fresh(top_by_memory(&table, top_n), Utc::now(), latency, "sysinfo::processes"),
        ),
        Err(err) => {
            warn!("process sampler error: {}", err);
            let envelope = SampleEnvelope::errored(Utc::now(), latency, "sysinfo::processes", &err);
            (envelope.clone(), envelope)
        }
    };

    let mut extras = Vec::with_capacity(sources.optional.len());
    for metric in sources.optional.iter_mut() {
        let started = Instant::now();
        let result = metric.attempt();
        if let Err(err) = &result {
            warn!("{} unavailable: {}", metric.label(), err);
        }
        extras.push(ExtraLine {
            label: metric.label().to_string(),
            value: SampleEnvelope::from_result(result, Utc::now(), started.elapsed(), metric.source()),
        });
    }

    info!(
        "report collected: cpu={:.1}% mem={:.1}% disk={:.1}%",
        cpu.percent, memory.used_percent, disk.used_percent
    );

    Ok(HealthSnapshot {
        generated_at,
        host: sources.host.clone(),
        cpu,
        memory,
        disk,
        top_n,
        top_cpu,
        top_memory,
        extras,
    })
}

/// Collect and write the report in the configured format.
pub fn generate<W: Write>(
    config: &ReportConfig,
    sources: &mut Sources,
    out: &mut W,
) -> Result<HealthSnapshot, ReportError> {
    let snapshot = collect(sources, config.top_n)?;
    match config.output {
        OutputFormat::Text => render_text(&snapshot, &Palette::new(config.color), out)?,
        OutputFormat::Json => render_json(&snapshot, out)?,
    }
    out.flush()?;
    Ok(snapshot)
}
