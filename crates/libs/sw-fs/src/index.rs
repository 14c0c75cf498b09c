//! Output artifact index.
//!
//! Job folders are named `<domain>_<date>_<mode>`. The index is rebuilt from
//! the directory listing on every query and never cached.

use std::cmp::Reverse;

use sw_models::record::JobRecord;
use tracing::warn;

use crate::{layout::OutputLayout, prelude::*, stats::collect_stats};

const NAME_DELIMITER: char = '_';

/// Parts of a job folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderName {
    pub domain: String,
    pub date: String,
    pub mode: String,
}

/// Split a folder name into domain, date and mode.
///
/// The first segment is the domain, the last one the mode and everything in
/// between the date. Names with fewer than three segments are not job folders.
///
/// # Examples
///
/// ```rust
/// use sw_fs::index::parse_folder_name;
///
/// let name = parse_folder_name("acme.com_20240501_120000_deep").unwrap();
/// assert_eq!(name.domain, "acme.com");
/// assert_eq!(name.date, "20240501_120000");
/// assert_eq!(name.mode, "deep");
/// ```
pub fn parse_folder_name(name: &str) -> Option<FolderName> {
    let parts: Vec<&str> = name.split(NAME_DELIMITER).collect();
    if parts.len() < 3 {
        return None;
    }
    let last = parts.len() - 1;
    Some(FolderName {
        domain: parts[0].to_string(),
        date: parts[1..last].join("_"),
        mode: parts[last].to_string(),
    })
}

/// Names of the direct subdirectories of the output root.
///
/// A missing root is treated as empty.
pub fn list_job_folders(layout: &OutputLayout) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(&layout.root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!("Skipping non UTF-8 folder {:?}", name),
        }
    }
    Ok(names)
}

/// Build a record for one folder, or `None` if it isn't a job folder.
pub fn job_record(layout: &OutputLayout, folder: &str) -> Option<JobRecord> {
    let name = parse_folder_name(folder)?;
    let dir = layout.job_dir(folder)?;
    Some(JobRecord {
        id: folder.to_string(),
        domain: name.domain,
        mode: name.mode,
        date: name.date,
        has_report: dir.join(&layout.report_file).is_file(),
        stats: collect_stats(&dir),
    })
}

/// All job records, newest first.
pub fn list_jobs(layout: &OutputLayout) -> Result<Vec<JobRecord>> {
    let mut records: Vec<JobRecord> = list_job_folders(layout)?
        .iter()
        .filter_map(|folder| job_record(layout, folder))
        .collect();
    records.sort_by_key(|record| Reverse((record.date.clone(), record.id.clone())));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::stats::NUCLEI_FINDINGS_FILE;

    #[test]
    fn parses_names() {
        assert_eq!(
            parse_folder_name("acme.com_20240501_120000_deep"),
            Some(FolderName {
                domain: String::from("acme.com"),
                date: String::from("20240501_120000"),
                mode: String::from("deep"),
            })
        );
        assert_eq!(
            parse_folder_name("example.com_20240101_standard").map(|n| n.date),
            Some(String::from("20240101"))
        );
        assert_eq!(parse_folder_name("logs"), None);
        assert_eq!(parse_folder_name("a_b"), None);
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path().join("nope"), "logs/events.jsonl", "report.html");
        assert!(list_jobs(&layout).unwrap().is_empty());
    }

    #[test]
    fn lists_newest_first_with_stats() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let layout = OutputLayout::new(root, "logs/events.jsonl", "report.html");

        fs::create_dir_all(root.join("old.com_20230101_080000_fast")).unwrap();
        fs::create_dir_all(root.join("new.com_20240501_120000_deep/vulns")).unwrap();
        fs::create_dir_all(root.join("logs")).unwrap();
        fs::write(root.join("stray_file_here.txt"), "x").unwrap();
        fs::write(root.join("new.com_20240501_120000_deep/report.html"), "<html/>").unwrap();
        fs::write(
            root.join("new.com_20240501_120000_deep").join(NUCLEI_FINDINGS_FILE),
            "[high] x\n[low] y\n",
        )
        .unwrap();

        let jobs = list_jobs(&layout).unwrap();
        let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["new.com_20240501_120000_deep", "old.com_20230101_080000_fast"]
        );
        assert!(jobs[0].has_report);
        assert_eq!(jobs[0].stats.nuclei_findings, 2);
        assert_eq!(jobs[0].mode, "deep");
        assert!(!jobs[1].has_report);
        assert!(jobs[1].stats.is_empty());
    }
}
