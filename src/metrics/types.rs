use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::MetricError;

/// A best-effort value plus where it came from, or why it is missing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SampleEnvelope<T> {
    pub value: Option<T>,
    pub collected_at: DateTime<Utc>,
    pub source: String,
    pub latency_ms: u32,
    pub error: Option<String>,
    pub placeholder: Option<String>,
}

impl<T> SampleEnvelope<T> {
    pub fn fresh(value: T, collected_at: DateTime<Utc>, latency: Duration, source: &str) -> Self {
        SampleEnvelope {
            value: Some(value),
            collected_at,
            source: source.to_string(),
            latency_ms: latency.as_millis().min(u32::MAX as u128) as u32,
            error: None,
            placeholder: None,
        }
    }

    pub fn errored(
        collected_at: DateTime<Utc>,
        latency: Duration,
        source: &str,
        error: &MetricError,
    ) -> Self {
        SampleEnvelope {
            value: None,
            collected_at,
            source: source.to_string(),
            latency_ms: latency.as_millis().min(u32::MAX as u128) as u32,
            error: Some(error.to_string()),
            placeholder: Some(error.placeholder().to_string()),
        }
    }

    pub fn from_result(
        result: Result<T, MetricError>,
        collected_at: DateTime<Utc>,
        latency: Duration,
        source: &str,
    ) -> Self {
        match result {
            Ok(value) => SampleEnvelope::fresh(value, collected_at, latency, source),
            Err(err) => SampleEnvelope::errored(collected_at, latency, source, &err),
        }
    }

    pub fn placeholder_text(&self) -> &str {
        self.placeholder
            .as_deref()
            .unwrap_or(crate::error::UNAVAILABLE)
    }
}

/// Busy percentage over one sampling window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CpuUsage {
    pub percent: f64,
    pub window_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
    pub used_percent: f64,
    pub source: String,
}

impl MemoryStats {
    /// "Used" is `total - available`, not `total - free`: page cache the
    /// kernel can reclaim is not counted against the host.
    pub fn from_kib(total_kb: u64, available_kb: u64, source: &str) -> Self {
        let used_kb = total_kb.saturating_sub(available_kb);
        MemoryStats {
            total_bytes: total_kb.saturating_mul(1024),
            available_bytes: available_kb.saturating_mul(1024),
            used_bytes: used_kb.saturating_mul(1024),
            used_percent: percent_of(used_kb, total_kb),
            source: source.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiskSnapshot {
    pub device: String,
    pub mount_point: String,
    pub file_system: String,
    pub total_space: u64,
    pub available_space: u64,
    pub used_space: u64,
}

/// Totals across persistent filesystems.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub used_percent: f64,
    pub filesystems: Vec<DiskSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// `part / whole * 100` rounded to one decimal; `0.0` when `whole` is zero.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_one_decimal(part as f64 / whole as f64 * 100.0)
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UptimeSnapshot {
    pub uptime_seconds: u64,
    pub boot_time_seconds: u64,
    pub load: LoadAverage,
}
