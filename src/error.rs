use std::io;

use thiserror::Error;

pub const UNAVAILABLE: &str = "unavailable";
pub const TOOLS_UNAVAILABLE: &str = "tools unavailable";

/// Failure of a single reader.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("{metric} unavailable: {reason}")]
    MetricUnavailable { metric: &'static str, reason: String },

    #[error("required tool `{tool}` not found")]
    ToolMissing { tool: String },
}

impl MetricError {
    pub fn unavailable(metric: &'static str, reason: impl Into<String>) -> Self {
        MetricError::MetricUnavailable {
            metric,
            reason: reason.into(),
        }
    }

    pub fn tool_missing(tool: impl Into<String>) -> Self {
        MetricError::ToolMissing { tool: tool.into() }
    }

    /// Text rendered in place of a best-effort value that could not be read.
    pub fn placeholder(&self) -> &'static str {
        match self {
            MetricError::MetricUnavailable { .. } => UNAVAILABLE,
            MetricError::ToolMissing { .. } => TOOLS_UNAVAILABLE,
        }
    }
}

/// Failure that aborts the whole report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cpu sampling failed: {0}")]
    Cpu(#[source] MetricError),

    #[error("memory reading failed: {0}")]
    Memory(#[source] MetricError),

    #[error("disk reading failed: {0}")]
    Disk(#[source] MetricError),

    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}
