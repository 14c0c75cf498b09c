//! Stats aggregator.
//!
//! Counters are recomputed from disk on every call and a missing file counts
//! as zero, so this never fails.

use std::path::Path;

use sw_models::record::StatsSnapshot;
use tracing::debug;

/// Artifact files, relative to a job folder, backing each counter.
pub const SUBDOMAINS_FILE: &str = "recon/subdomains_final.txt";
pub const LIVE_URLS_FILE: &str = "recon/urls_live.txt";
pub const TOTAL_URLS_FILE: &str = "content/urls_all.txt";
pub const JS_FILES_FILE: &str = "js/js_files.txt";
pub const NUCLEI_FINDINGS_FILE: &str = "vulns/nuclei_results.txt";
pub const SECRETS_FILE: &str = "js/secrets_found.txt";

/// Number of non-blank lines in `path`, or 0 if it can't be read.
pub fn count_non_blank_lines(path: &Path) -> u64 {
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count() as u64,
        Err(err) => {
            debug!("Artifact {} unavailable: {err}", path.display());
            0
        }
    }
}

/// Compute all counters for one job folder.
pub fn collect_stats(job_dir: &Path) -> StatsSnapshot {
    let count = |file: &str| count_non_blank_lines(&job_dir.join(file));
    StatsSnapshot {
        subdomains: count(SUBDOMAINS_FILE),
        live_urls: count(LIVE_URLS_FILE),
        total_urls: count(TOTAL_URLS_FILE),
        js_files: count(JS_FILES_FILE),
        nuclei_findings: count(NUCLEI_FINDINGS_FILE),
        secrets: count(SECRETS_FILE),
    }
}
