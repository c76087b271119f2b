mod cpu;
mod disk;
mod memory;
mod sampler;
#[cfg(test)]
mod tests;
mod types;
mod uptime;

pub use cpu::{utilization_percent, CpuCounters};
pub use disk::{aggregate as aggregate_disks, collect_disk_usage, is_virtual_fs, DiskSource, SysinfoDisks};
pub use memory::{parse_free_output, parse_meminfo, MemInfo, MemInfoSource, MemorySource};
pub use sampler::{CounterSource, OpenWindow, ProcStatSource, UtilizationSampler, DEFAULT_WINDOW};
pub use types::{
    percent_of, round_one_decimal, CpuUsage, DiskSnapshot, DiskUsage, LoadAverage, MemoryStats,
    SampleEnvelope, UptimeSnapshot,
};
pub use uptime::{collect_uptime_sample, format_load, format_uptime};
