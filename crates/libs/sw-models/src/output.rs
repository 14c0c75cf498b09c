//! Raw console output of a running scan.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Origin stream of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Display category derived from the line content.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineClass {
    Success,
    Warn,
    Error,
    Phase,
    Info,
    #[default]
    Default,
}

/// One complete line of process output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Unset until the job's output folder has been correlated.
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
    /// Line content without its terminator.
    #[serde(rename = "line")]
    pub text: String,
    pub stream: OutputStream,
    pub class: LineClass,
}

impl OutputLine {
    pub fn new(text: impl Into<String>, stream: OutputStream, class: LineClass) -> Self {
        Self {
            job_id: None,
            text: text.into(),
            stream,
            class,
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
        }
    }
}
