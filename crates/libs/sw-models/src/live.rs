//! Messages exchanged over the live WebSocket channel.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    job::ScanMode,
    output::OutputLine,
    phase::PhaseEvent,
};

/// Messages pushed from the server to every live subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LiveEvent {
    /// A launch was accepted and the scanner process is running.
    Launched { domain: String, mode: ScanMode },
    /// The job's output folder was correlated.
    Started {
        #[serde(rename = "jobId")]
        job_id: String,
        domain: String,
        mode: ScanMode,
    },
    /// One line of console output.
    Log(OutputLine),
    /// One record of the job's structured event log.
    PhaseEvent(PhaseEvent),
    /// Structured telemetry will not be available for this job.
    Degraded {
        #[serde(rename = "jobId")]
        job_id: Option<String>,
        domain: String,
        reason: String,
    },
    /// Terminal event of a job.
    Done {
        #[serde(rename = "jobId")]
        job_id: Option<String>,
        #[serde(rename = "exitCode")]
        exit_code: Option<i32>,
    },
    /// The set of job folders changed; clients should re-fetch the list.
    JobsUpdated,
}

/// Messages sent from a subscriber to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LiveClientMessage {
    /// Ask for a `jobs_updated` signal on this connection only.
    GetJobs,
}

impl fmt::Display for LiveEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveEvent::Launched { domain, mode } => write!(f, "launched {domain} [{mode}]"),
            LiveEvent::Started { job_id, .. } => write!(f, "started {job_id}"),
            LiveEvent::Log(line) => write!(f, "log [{}] {}", line.stream, line.text),
            LiveEvent::PhaseEvent(event) => write!(
                f,
                "phase {} {} {:?}",
                event.job_id, event.record.phase, event.record.status
            ),
            LiveEvent::Degraded { domain, reason, .. } => {
                write!(f, "degraded {domain}: {reason}")
            }
            LiveEvent::Done { job_id, exit_code } => write!(
                f,
                "done {} exit {:?}",
                job_id.as_deref().unwrap_or("<uncorrelated>"),
                exit_code
            ),
            LiveEvent::JobsUpdated => write!(f, "jobs updated"),
        }
    }
}
