use sysinfo::System;

use crate::error::MetricError;

use super::types::{LoadAverage, UptimeSnapshot};

pub fn collect_uptime_sample() -> Result<UptimeSnapshot, MetricError> {
    let uptime_seconds = System::uptime();
    if uptime_seconds == 0 {
        return Err(MetricError::unavailable("uptime", "uptime reported as zero"));
    }

    let load = System::load_average();
    Ok(UptimeSnapshot {
        uptime_seconds,
        boot_time_seconds: System::boot_time(),
        load: LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        },
    })
}

/// `3d 4h 5m`; days are omitted below one day.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

pub fn format_load(load: &LoadAverage) -> String {
    format!("{:.2} {:.2} {:.2}", load.one, load.five, load.fifteen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(59), "0h 0m");
        assert_eq!(format_uptime(3_660), "1h 1m");
        assert_eq!(format_uptime(3 * 86_400 + 4 * 3_600 + 5 * 60 + 7), "3d 4h 5m");
    }

    #[test]
    fn load_uses_two_decimals() {
        let load = LoadAverage {
            one: 0.5,
            five: 1.234,
            fifteen: 12.0,
        };
        assert_eq!(format_load(&load), "0.50 1.23 12.00");
    }
}
