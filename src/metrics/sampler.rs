use std::fs;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::MetricError;

use super::cpu::{utilization_percent, CpuCounters};
use super::types::CpuUsage;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// Anything that can produce a cumulative counter sample.
pub trait CounterSource {
    fn read_counters(&mut self) -> Result<CpuCounters, MetricError>;
}

/// Reads the live kernel counters from `<proc_root>/stat`.
pub struct ProcStatSource {
    path: PathBuf,
}

impl ProcStatSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProcStatSource { path: path.into() }
    }
}

impl CounterSource for ProcStatSource {
    fn read_counters(&mut self) -> Result<CpuCounters, MetricError> {
        let content = fs::read_to_string(&self.path).map_err(|err| {
            MetricError::unavailable("cpu", format!("{}: {}", self.path.display(), err))
        })?;
        CpuCounters::parse(&content)
    }
}

impl<S: CounterSource + ?Sized> CounterSource for Box<S> {
    fn read_counters(&mut self) -> Result<CpuCounters, MetricError> {
        (**self).read_counters()
    }
}

/// First half of a measurement: the opening sample and when it was taken.
#[derive(Debug, Clone)]
pub struct OpenWindow {
    first: CpuCounters,
    opened_at: Instant,
}

impl OpenWindow {
    pub fn first_sample(&self) -> &CpuCounters {
        &self.first
    }
}

/// Two-sample utilization measurement: `begin`, `wait`, `finish`.
pub struct UtilizationSampler<S> {
    source: S,
    window: Duration,
}

impl<S: CounterSource> UtilizationSampler<S> {
    pub fn with_window(source: S, window: Duration) -> Self {
        UtilizationSampler { source, window }
    }

    pub fn begin(&mut self) -> Result<OpenWindow, MetricError> {
        let first = self.source.read_counters()?;
        Ok(OpenWindow {
            first,
            opened_at: Instant::now(),
        })
    }

    /// Blocks for whatever is left of the window since `begin`.
    pub fn wait(&self, open: &OpenWindow) {
        let elapsed = open.opened_at.elapsed();
        if let Some(remaining) = self.window.checked_sub(elapsed) {
            if !remaining.is_zero() {
                sleep(remaining);
            }
        }
    }

    pub fn finish(&mut self, open: OpenWindow) -> Result<CpuUsage, MetricError> {
        let second = self.source.read_counters()?;
        let percent = utilization_percent(&open.first, &second);
        let delta = second.delta_since(&open.first);
        debug!(
            "cpu window: total_delta={} idle_delta={} busy={:.1}%",
            delta.grand_total(),
            delta.idle_total(),
            percent
        );
        Ok(CpuUsage {
            percent,
            window_ms: open.opened_at.elapsed().as_millis().min(u64::MAX as u128) as u64,
        })
    }

    pub fn sample(&mut self) -> Result<CpuUsage, MetricError> {
        let open = self.begin()?;
        self.wait(&open);
        self.finish(open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Result<CpuCounters, MetricError>>);

    impl CounterSource for Scripted {
        fn read_counters(&mut self) -> Result<CpuCounters, MetricError> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(MetricError::unavailable("cpu", "script exhausted")))
        }
    }

    fn idle_busy(idle: u64, busy: u64) -> CpuCounters {
        CpuCounters {
            idle,
            system: busy,
            ..CpuCounters::default()
        }
    }

    #[test]
    fn sample_derives_from_two_reads() {
        let source = Scripted(VecDeque::from(vec![
            Ok(idle_busy(10_000, 2_000)),
            Ok(idle_busy(10_900, 2_100)),
        ]));
        let mut sampler = UtilizationSampler::with_window(source, Duration::ZERO);
        let usage = sampler.sample().unwrap();
        assert_eq!(usage.percent, 10.0);
    }

    #[test]
    fn protocol_steps_can_be_driven_separately() {
        let source = Scripted(VecDeque::from(vec![
            Ok(idle_busy(0, 0)),
            Ok(idle_busy(250, 750)),
        ]));
        let mut sampler = UtilizationSampler::with_window(source, Duration::ZERO);
        let open = sampler.begin().unwrap();
        assert_eq!(open.first_sample().idle, 0);
        sampler.wait(&open);
        assert_eq!(sampler.finish(open).unwrap().percent, 75.0);
    }

    #[test]
    fn unchanged_counters_read_as_idle() {
        let same = idle_busy(42, 42);
        let source = Scripted(VecDeque::from(vec![Ok(same), Ok(same)]));
        let mut sampler = UtilizationSampler::with_window(source, Duration::ZERO);
        assert_eq!(sampler.sample().unwrap().percent, 0.0);
    }

    #[test]
    fn unreadable_source_fails_as_unavailable() {
        let mut sampler = UtilizationSampler::with_window(
            ProcStatSource::new("/nonexistent/proc/stat"),
            Duration::ZERO,
        );
        let err = sampler.sample().unwrap_err();
        assert!(matches!(err, MetricError::MetricUnavailable { .. }));
    }

    #[test]
    fn wait_honours_window() {
        let same = idle_busy(1, 1);
        let source = Scripted(VecDeque::from(vec![Ok(same), Ok(same)]));
        let mut sampler = UtilizationSampler::with_window(source, Duration::from_millis(30));
        let started = Instant::now();
        sampler.sample().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
