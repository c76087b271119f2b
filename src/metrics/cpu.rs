use serde::{Deserialize, Serialize};

use crate::error::MetricError;

use super::types::round_one_decimal;

/// Cumulative CPU time counters from the aggregate `cpu` line of `/proc/stat`.
///
/// Units are kernel clock ticks since boot. Only the difference between two
/// samples carries meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuCounters {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuCounters {
    /// Parse `/proc/stat` content. Trailing fields past `steal` are ignored and
    /// fields older kernels omit read as zero.
    pub fn parse(content: &str) -> Result<Self, MetricError> {
        let line = content
            .lines()
            .find(|line| line.split_whitespace().next() == Some("cpu"))
            .ok_or_else(|| MetricError::unavailable("cpu", "no aggregate cpu line"))?;

        let fields = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .map(|field| field.parse::<u64>())
            .collect::<Result<Vec<u64>, _>>()
            .map_err(|err| MetricError::unavailable("cpu", format!("bad counter: {}", err)))?;

        if fields.len() < 4 {
            return Err(MetricError::unavailable(
                "cpu",
                format!("expected at least 4 counters, got {}", fields.len()),
            ));
        }

        let field = |idx: usize| fields.get(idx).copied().unwrap_or(0);
        Ok(CpuCounters {
            user: field(0),
            nice: field(1),
            system: field(2),
            idle: field(3),
            iowait: field(4),
            irq: field(5),
            softirq: field(6),
            steal: field(7),
        })
    }

    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    pub fn busy_total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    pub fn grand_total(&self) -> u64 {
        self.idle_total().saturating_add(self.busy_total())
    }

    /// Field-wise `self - earlier`. A field that went backwards (wrap or
    /// counter reset) contributes zero.
    pub fn delta_since(&self, earlier: &CpuCounters) -> CpuCounters {
        CpuCounters {
            user: self.user.saturating_sub(earlier.user),
            nice: self.nice.saturating_sub(earlier.nice),
            system: self.system.saturating_sub(earlier.system),
            idle: self.idle.saturating_sub(earlier.idle),
            iowait: self.iowait.saturating_sub(earlier.iowait),
            irq: self.irq.saturating_sub(earlier.irq),
            softirq: self.softirq.saturating_sub(earlier.softirq),
            steal: self.steal.saturating_sub(earlier.steal),
        }
    }
}

/// Busy percentage between two samples, rounded to one decimal.
pub fn utilization_percent(first: &CpuCounters, second: &CpuCounters) -> f64 {
    let delta = second.delta_since(first);
    let total_delta = delta.grand_total();
    if total_delta == 0 {
        return 0.0;
    }
    let idle_delta = delta.idle_total();
    let busy = total_delta.saturating_sub(idle_delta);
    round_one_decimal(busy as f64 / total_delta as f64 * 100.0)
}
