//! Daemon configuration types.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::prelude::*;

/// HTTP and live-channel listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the API binds to.
    pub address: String,
}

/// Location of the external scanner and its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Toolkit checkout; the scanner runs with this as working directory.
    pub root: PathBuf,
    /// Scanner entry point, relative to `root`.
    pub entry_point: PathBuf,
    /// Program used to execute the entry point.
    pub interpreter: String,
    /// Directory holding one folder per job, relative to `root`.
    pub output_dir: PathBuf,
}

/// How long to wait for a correlated job's event log to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLogWait {
    /// Give up after this many polls.
    Bounded(u32),
    /// Keep polling until the job exits.
    Forever,
}

/// Live telemetry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Event log path inside a job folder.
    pub events_log: PathBuf,
    /// Rendered report path inside a job folder.
    pub report_file: PathBuf,
    /// Cadence of existence polls and fallback rescans.
    pub poll_interval_ms: u64,
    pub event_log_wait: EventLogWait,
    /// Zero disables the correlation timeout.
    pub correlation_timeout_secs: u64,
    /// Upper bound on the final event-log drain once the scanner exits.
    pub drain_timeout_ms: u64,
    /// Events buffered per live subscriber before the oldest are dropped.
    pub hub_capacity: usize,
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanwatchConfig {
    pub server: ServerConfig,
    pub toolkit: ToolkitConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:3000"),
        }
    }
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            entry_point: PathBuf::from("bounty.sh"),
            interpreter: String::from("bash"),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            events_log: PathBuf::from("logs/events.jsonl"),
            report_file: PathBuf::from("report.html"),
            poll_interval_ms: 1000,
            event_log_wait: EventLogWait::Bounded(60),
            correlation_timeout_secs: 600,
            drain_timeout_ms: 2000,
            hub_capacity: 1024,
        }
    }
}

impl ScanwatchConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(file_path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", file_path.display());
        let contents = std::fs::read_to_string(file_path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(value: &str) -> Result<Self> {
        Ok(toml::from_str(value)?)
    }

    /// Absolute-or-relative path of the job output directory.
    pub fn output_root(&self) -> PathBuf {
        self.toolkit.root.join(&self.toolkit.output_dir)
    }
}

impl TelemetryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn correlation_timeout(&self) -> Option<Duration> {
        match self.correlation_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Maximum existence polls, `None` meaning unbounded.
    pub fn max_wait_attempts(&self) -> Option<u32> {
        match self.event_log_wait {
            EventLogWait::Bounded(attempts) => Some(attempts),
            EventLogWait::Forever => None,
        }
    }
}
