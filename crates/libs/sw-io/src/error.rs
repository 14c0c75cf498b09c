//! Process error types.

use std::path::PathBuf;

/// Errors that can occur while launching a process.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The scanner entry point does not exist.
    #[error("entry point {0} not found")]
    EntryPointMissing(PathBuf),

    /// Failed to spawn the process.
    #[error("failed to spawn process: {0}")]
    SpawnProcessFail(#[source] std::io::Error),

    /// A piped stream was not available on the child.
    #[error("child process has no {0} pipe")]
    MissingPipe(&'static str),
}
