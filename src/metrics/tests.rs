#![cfg(test)]

use super::{MemoryStats, SampleEnvelope};
use crate::error::{MetricError, TOOLS_UNAVAILABLE, UNAVAILABLE};
use chrono::Utc;
use std::time::Duration;

#[test]
fn envelope_fresh_preserves_metadata() {
    let start = Utc::now();
    let envelope = SampleEnvelope::fresh(42u8, start, Duration::from_millis(12), "unit-test");
    assert_eq!(envelope.value, Some(42));
    assert_eq!(envelope.source, "unit-test");
    assert_eq!(envelope.latency_ms, 12);
    assert!(envelope.error.is_none());
    assert!(envelope.placeholder.is_none());
}

#[test]
fn envelope_errored_carries_placeholder() {
    let now = Utc::now();
    let missing: SampleEnvelope<String> = SampleEnvelope::errored(
        now,
        Duration::ZERO,
        "who",
        &MetricError::tool_missing("who"),
    );
    assert!(missing.value.is_none());
    assert_eq!(missing.placeholder_text(), TOOLS_UNAVAILABLE);
    assert!(missing.error.as_deref().unwrap_or_default().contains("who"));

    let unreadable: SampleEnvelope<String> = SampleEnvelope::from_result(
        Err(MetricError::unavailable("uptime", "zero")),
        now,
        Duration::ZERO,
        "sysinfo::uptime",
    );
    assert_eq!(unreadable.placeholder_text(), UNAVAILABLE);
}

#[test]
fn memory_percentages_round_to_one_decimal() {
    let stats = MemoryStats::from_kib(3, 2, "unit-test");
    assert_eq!(stats.used_percent, 33.3);

    let empty = MemoryStats::from_kib(0, 0, "unit-test");
    assert_eq!(empty.used_percent, 0.0);
    assert_eq!(empty.used_bytes, 0);
}

#[test]
fn available_above_total_never_underflows() {
    let stats = MemoryStats::from_kib(1_000, 2_000, "unit-test");
    assert_eq!(stats.used_bytes, 0);
    assert_eq!(stats.used_percent, 0.0);
}
