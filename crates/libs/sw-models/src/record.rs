//! Historical job records derived from the output directory.

use serde::{Deserialize, Serialize};

/// Scalar counters computed from a job's artifact files.
///
/// Each counter is the number of non-blank lines in one well-known file and is
/// zero when the file does not exist.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub subdomains: u64,
    pub live_urls: u64,
    pub total_urls: u64,
    pub js_files: u64,
    pub nuclei_findings: u64,
    pub secrets: u64,
}

impl StatsSnapshot {
    pub fn is_empty(&self) -> bool {
        *self == StatsSnapshot::default()
    }
}

/// A job folder as seen by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Exactly the folder name; the same value used as `jobId` once correlated.
    pub id: String,
    pub domain: String,
    pub mode: String,
    pub date: String,
    pub has_report: bool,
    pub stats: StatsSnapshot,
}
