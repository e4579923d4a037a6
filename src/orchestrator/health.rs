//! Liveness artifact
//!
//! A small JSON document rewritten while the loop runs and once more on
//! exit, for external monitoring:
//!
//! ```json
//! {
//!   "timestamp": "2024-06-01T10:00:00",
//!   "status": "running",
//!   "pid": 4242,
//!   "published_today": 1,
//!   "posts_per_day": 3,
//!   "wordpress_failures": 0,
//!   "telegram_failures": 2
//! }
//! ```

use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Loop state reported to monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Stopped,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    /// Interrupt or terminate signal
    Signal,
    /// Stop marker
    StopCommand,
    /// Restart marker; the supervisor starts a new process
    Restart,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::StopCommand => "stop_command",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessReport {
    /// ISO-8601 local time
    pub timestamp: String,
    pub status: RunState,
    pub pid: u32,
    pub published_today: usize,
    pub posts_per_day: u32,
    pub wordpress_failures: u32,
    pub telegram_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_reason: Option<ShutdownReason>,
}

impl LivenessReport {
    pub fn new(
        at: NaiveDateTime,
        status: RunState,
        published_today: usize,
        posts_per_day: u32,
        failures: (u32, u32),
    ) -> Self {
        Self {
            timestamp: at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            status,
            pid: std::process::id(),
            published_today,
            posts_per_day,
            wordpress_failures: failures.0,
            telegram_failures: failures.1,
            shutdown_reason: None,
        }
    }

    pub fn with_shutdown_reason(mut self, reason: ShutdownReason) -> Self {
        self.shutdown_reason = Some(reason);
        self
    }
}

/// Replace the artifact atomically (temp file, then rename)
pub fn write_report(path: &Path, report: &LivenessReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(report)?;
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_name);

    std::fs::write(&temp_path, json).map_err(|e| {
        Error::control(format!("failed to write {}: {e}", temp_path.display()))
    })?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        Error::control(format!("failed to replace {}: {e}", path.display()))
    })?;

    tracing::debug!(path = %path.display(), status = ?report.status, "Liveness artifact written");
    Ok(())
}

/// Read the artifact, `None` when it does not exist
pub fn read_report(path: &Path) -> Result<Option<LivenessReport>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
