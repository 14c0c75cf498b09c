//! Point-in-time reads of a job's event log.

use std::path::Path;

use sw_models::phase::PhaseRecord;
use tracing::warn;

use crate::prelude::*;

/// Parse every well-formed line of an event log.
///
/// A missing log yields an empty list; malformed lines are skipped.
pub fn read_event_log(path: &Path) -> Result<Vec<PhaseRecord>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match PhaseRecord::from_line(line) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("Skipping malformed event line in {}: {err}", path.display());
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use sw_models::phase::PhaseStatus;

    use super::*;

    #[test]
    fn missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_event_log(&dir.path().join("events.jsonl")).unwrap().is_empty());
    }

    #[test]
    fn skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(
            &path,
            concat!(
                "{\"phase\":\"recon\",\"message\":\"start\",\"status\":\"running\"}\n",
                "garbage\n",
                "\n",
                "{\"phase\":\"recon\",\"message\":\"ok\",\"status\":\"done\"}\n",
                "{\"phase\":\"hosts\",\"sta",
            ),
        )
        .unwrap();

        let records = read_event_log(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, PhaseStatus::Running);
        assert_eq!(records[1].message, "ok");
    }
}
