pub mod best_effort;
pub mod config;
pub mod error;
pub mod metrics;
pub mod report;
pub mod system_info;

pub use config::{OutputFormat, ReportConfig};
pub use error::{MetricError, ReportError};
pub use report::{collect, generate, HealthSnapshot, Sources};
