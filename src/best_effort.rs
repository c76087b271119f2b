//! Stats that may legitimately be missing on a host. Each one is attempted
//! once; a failure becomes a placeholder in the report instead of an abort.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

use log::debug;
use regex::Regex;

use crate::error::MetricError;
use crate::metrics::{collect_uptime_sample, format_load, format_uptime};
use crate::system_info::get_system_info;

/// One line per rejected password, from sshd or login(1).
const FAILED_AUTH_PATTERN: &str = r"(?i)(failed password|failed login)";
/// Lines that precede a rejection from the same `daemon[pid]`.
const PRELUDE_PATTERN: &str = r"(?i)(invalid user|authentication failure)";
const DAEMON_TAG_PATTERN: &str = r"[\w.-]+\[\d+\]:";

pub trait OptionalMetric {
    fn label(&self) -> &str;

    /// Where the value comes from, for the JSON envelope.
    fn source(&self) -> &str;

    fn attempt(&mut self) -> Result<String, MetricError>;
}

pub struct OsIdentity;

impl OptionalMetric for OsIdentity {
    fn label(&self) -> &str {
        "OS"
    }

    fn source(&self) -> &str {
        "sysinfo::system"
    }

    fn attempt(&mut self) -> Result<String, MetricError> {
        let info = get_system_info()?;
        Ok(format!("{} (kernel {})", info.os_name, info.kernel_version))
    }
}

pub struct UptimeAndLoad;

impl OptionalMetric for UptimeAndLoad {
    fn label(&self) -> &str {
        "Uptime"
    }

    fn source(&self) -> &str {
        "sysinfo::uptime"
    }

    fn attempt(&mut self) -> Result<String, MetricError> {
        let sample = collect_uptime_sample()?;
        Ok(format!(
            "{} | load average: {}",
            format_uptime(sample.uptime_seconds),
            format_load(&sample.load)
        ))
    }
}

/// Run `program args...` and return stdout, mapping a missing binary to
/// `ToolMissing`.
fn run_tool(program: &str, args: &[&str], metric: &'static str) -> Result<String, MetricError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|err| match err.kind() {
            ErrorKind::NotFound => MetricError::tool_missing(program),
            _ => MetricError::unavailable(metric, format!("failed to execute {}: {}", program, err)),
        })?;

    if !output.status.success() {
        return Err(MetricError::unavailable(
            metric,
            format!("{} exited with {}", program, output.status),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub struct LoggedInUsers {
    command: String,
}

impl LoggedInUsers {
    pub fn new() -> Self {
        Self::with_command("who")
    }

    pub fn with_command(command: impl Into<String>) -> Self {
        LoggedInUsers {
            command: command.into(),
        }
    }
}

impl Default for LoggedInUsers {
    fn default() -> Self {
        Self::new()
    }
}

/// Session count and distinct user names from `who` output.
pub fn parse_sessions(output: &str) -> (usize, Vec<String>) {
    let sessions: Vec<&str> = output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    let users: BTreeSet<&str> = sessions.iter().copied().collect();
    (
        sessions.len(),
        users.into_iter().map(str::to_string).collect(),
    )
}

impl OptionalMetric for LoggedInUsers {
    fn label(&self) -> &str {
        "Logged-in users"
    }

    fn source(&self) -> &str {
        &self.command
    }

    fn attempt(&mut self) -> Result<String, MetricError> {
        let output = run_tool(&self.command, &[], "sessions")?;
        let (count, users) = parse_sessions(&output);
        if users.is_empty() {
            Ok(count.to_string())
        } else {
            Ok(format!("{} ({})", count, users.join(", ")))
        }
    }
}

pub struct FailedLogins {
    auth_logs: Vec<PathBuf>,
    lastb_command: String,
    source: String,
}

impl FailedLogins {
    pub fn new(auth_logs: Vec<PathBuf>) -> Self {
        FailedLogins {
            auth_logs,
            lastb_command: "lastb".to_string(),
            source: "auth log / lastb".to_string(),
        }
    }

    pub fn with_lastb_command(mut self, command: impl Into<String>) -> Self {
        self.lastb_command = command.into();
        self
    }

    fn from_logs(&self, patterns: &AuthPatterns) -> Option<(usize, String)> {
        for path in &self.auth_logs {
            match fs::read(path) {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    return Some((count_failed_attempts(&text, patterns), path.display().to_string()));
                }
                Err(err) => debug!("auth log {} unreadable: {}", path.display(), err),
            }
        }
        None
    }
}

pub struct AuthPatterns {
    failure: Regex,
    prelude: Regex,
    daemon_tag: Regex,
}

impl AuthPatterns {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(AuthPatterns {
            failure: Regex::new(FAILED_AUTH_PATTERN)?,
            prelude: Regex::new(PRELUDE_PATTERN)?,
            daemon_tag: Regex::new(DAEMON_TAG_PATTERN)?,
        })
    }

    fn tag<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.daemon_tag.find(line).map(|m| m.as_str())
    }
}

/// One event per attempt. sshd logs a bad user as `Invalid user`, then the
/// PAM `authentication failure`, then `Failed password for invalid user`;
/// prelude lines only count when their `daemon[pid]` never logged the failure.
pub fn count_failed_attempts(log: &str, patterns: &AuthPatterns) -> usize {
    let failed_tags: HashSet<&str> = log
        .lines()
        .filter(|line| patterns.failure.is_match(line))
        .filter_map(|line| patterns.tag(line))
        .collect();

    let mut orphan_tags = HashSet::new();
    let mut count = 0;
    for line in log.lines() {
        if patterns.failure.is_match(line) {
            count += 1;
        } else if patterns.prelude.is_match(line) {
            match patterns.tag(line) {
                Some(tag) if failed_tags.contains(tag) => {}
                Some(tag) => {
                    if orphan_tags.insert(tag) {
                        count += 1;
                    }
                }
                None => count += 1,
            }
        }
    }
    count
}

/// `lastb` prints one line per attempt followed by a blank line and a
/// `btmp begins ...` trailer.
pub fn count_lastb_entries(output: &str) -> usize {
    output
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with("btmp begins"))
        .count()
}

impl OptionalMetric for FailedLogins {
    fn label(&self) -> &str {
        "Failed logins"
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn attempt(&mut self) -> Result<String, MetricError> {
        let patterns = AuthPatterns::new()
            .map_err(|err| MetricError::unavailable("failed logins", err.to_string()))?;

        if let Some((count, path)) = self.from_logs(&patterns) {
            self.source = path.clone();
            return Ok(format!("{} (since rotation of {})", count, path));
        }

        let output = run_tool(&self.lastb_command, &[], "failed logins")?;
        self.source = self.lastb_command.clone();
        Ok(format!("{} (since btmp began)", count_lastb_entries(&output)))
    }
}

/// The readers in the order the report prints them.
pub fn default_metrics(auth_logs: Vec<PathBuf>) -> Vec<Box<dyn OptionalMetric>> {
    vec![
        Box::new(OsIdentity),
        Box::new(UptimeAndLoad),
        Box::new(LoggedInUsers::new()),
        Box::new(FailedLogins::new(auth_logs)),
    ]
}
