//! On-disk layout of the scanner output.

use std::path::{Component, Path, PathBuf};

/// Where job folders live and what they contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Directory holding one folder per job.
    pub root: PathBuf,
    /// Event log path relative to a job folder.
    pub events_log: PathBuf,
    /// Report path relative to a job folder.
    pub report_file: PathBuf,
}

impl OutputLayout {
    pub fn new(
        root: impl Into<PathBuf>,
        events_log: impl Into<PathBuf>,
        report_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            events_log: events_log.into(),
            report_file: report_file.into(),
        }
    }

    /// Folder of a job, or `None` when `job_id` is not a plain folder name.
    pub fn job_dir(&self, job_id: &str) -> Option<PathBuf> {
        let mut components = Path::new(job_id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == job_id => Some(self.root.join(name)),
            _ => None,
        }
    }

    pub fn events_path(&self, job_id: &str) -> Option<PathBuf> {
        self.job_dir(job_id).map(|dir| dir.join(&self.events_log))
    }

    pub fn report_path(&self, job_id: &str) -> Option<PathBuf> {
        self.job_dir(job_id).map(|dir| dir.join(&self.report_file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> OutputLayout {
        OutputLayout::new("/srv/output", "logs/events.jsonl", "report.html")
    }

    #[test]
    fn job_paths() {
        let layout = layout();
        assert_eq!(
            layout.events_path("a.com_20240101_000000_fast"),
            Some(PathBuf::from("/srv/output/a.com_20240101_000000_fast/logs/events.jsonl"))
        );
        assert_eq!(
            layout.report_path("a.com_20240101_000000_fast"),
            Some(PathBuf::from("/srv/output/a.com_20240101_000000_fast/report.html"))
        );
    }

    #[test]
    fn traversal_is_refused() {
        let layout = layout();
        for id in ["..", "../etc", "a/b", "/etc", "", "."] {
            assert_eq!(layout.job_dir(id), None, "{id}");
        }
    }
}
