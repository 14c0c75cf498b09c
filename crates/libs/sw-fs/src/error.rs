//! Filesystem error types.

/// Filesystem errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// The platform watcher could not be set up.
    #[error(transparent)]
    Notify(#[from] notify::Error),
}
