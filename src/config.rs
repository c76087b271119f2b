// src/config.rs

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::metrics::DEFAULT_WINDOW;

pub const PROC_ROOT_ENV: &str = "SERVER_STATS_PROC_ROOT";
pub const AUTH_LOGS_ENV: &str = "SERVER_STATS_AUTH_LOGS";
pub const NO_COLOR_ENV: &str = "NO_COLOR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    // Presentation
    pub color: bool,               // Default: true
    pub output: OutputFormat,      // Default: Text
    pub top_n: usize,              // Default: 5

    // Sampling
    pub sample_window: Duration,   // Default: 1 second

    // Data sources
    pub proc_root: PathBuf,        // Default: /proc
    pub auth_logs: Vec<PathBuf>,   // Default: auth.log, secure
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            color: true,
            output: OutputFormat::Text,
            top_n: 5,
            sample_window: DEFAULT_WINDOW,
            proc_root: PathBuf::from("/proc"),
            auth_logs: vec![
                PathBuf::from("/var/log/auth.log"),
                PathBuf::from("/var/log/secure"),
            ],
        }
    }
}

impl ReportConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = ReportConfig::default();

        // https://no-color.org: any non-empty value disables color
        if env::var_os(NO_COLOR_ENV).is_some_and(|v| !v.is_empty()) {
            config.color = false;
        }

        if let Some(root) = env::var_os(PROC_ROOT_ENV).filter(|v| !v.is_empty()) {
            config.proc_root = PathBuf::from(root);
        }

        if let Some(logs) = env::var_os(AUTH_LOGS_ENV).filter(|v| !v.is_empty()) {
            config.auth_logs = env::split_paths(&logs).collect();
        }

        config
    }

    pub fn proc_path(&self, name: &str) -> PathBuf {
        self.proc_root.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ReportConfig::default();
        assert!(config.color);
        assert_eq!(config.output, OutputFormat::Text);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.sample_window, Duration::from_secs(1));
        assert_eq!(config.proc_path("stat"), PathBuf::from("/proc/stat"));
        assert_eq!(config.auth_logs.len(), 2);
    }
}
