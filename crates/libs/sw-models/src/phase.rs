//! Structured progress records written by the scanner to its event log.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Progress of a single scanner phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Running,
    Done,
    Error,
}

/// One line of the event log.
///
/// Keys other than `phase`, `message` and `status` are kept in `extra` so they
/// reach subscribers untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: String,
    #[serde(default)]
    pub message: String,
    pub status: PhaseStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PhaseRecord {
    /// Parse one event-log line.
    ///
    /// Keys that would collide with the live-channel envelope are discarded.
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        let mut record: PhaseRecord = serde_json::from_str(line.trim())?;
        record.extra.remove("jobId");
        record.extra.remove("event");
        Ok(record)
    }
}

/// A phase record tagged with the job that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEvent {
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(flatten)]
    pub record: PhaseRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_line() {
        let record = PhaseRecord::from_line(r#"{"phase":"recon","status":"running"}"#).unwrap();
        assert_eq!(record.phase, "recon");
        assert_eq!(record.message, "");
        assert_eq!(record.status, PhaseStatus::Running);
        assert!(record.extra.is_empty());
    }

    #[test]
    fn keeps_extra_fields_but_drops_envelope_keys() {
        let record = PhaseRecord::from_line(
            r#"{"phase":"js","message":"12 files","status":"done","ts":"2024-05-01T12:00:00Z","jobId":"spoof"}"#,
        )
        .unwrap();
        assert_eq!(record.extra.get("ts"), Some(&Value::from("2024-05-01T12:00:00Z")));
        assert!(!record.extra.contains_key("jobId"));
    }

    #[test]
    fn rejects_unknown_status_and_garbage() {
        assert!(PhaseRecord::from_line(r#"{"phase":"x","status":"paused"}"#).is_err());
        assert!(PhaseRecord::from_line(r#"{"phase":"x","sta"#).is_err());
        assert!(PhaseRecord::from_line("not json").is_err());
    }

    #[test]
    fn phase_event_flattens_record() {
        let event = PhaseEvent {
            job_id: String::from("acme.com_20240501_120000_deep"),
            record: PhaseRecord::from_line(r#"{"phase":"vulns","message":"m","status":"error"}"#)
                .unwrap(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["jobId"], "acme.com_20240501_120000_deep");
        assert_eq!(value["phase"], "vulns");
        assert_eq!(value["status"], "error");
    }
}
