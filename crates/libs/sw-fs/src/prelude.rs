//! Common types and utilities.

/// Filesystem error type.
pub use crate::error::Error;

/// Filesystem result type.
pub type Result<T> = core::result::Result<T, Error>;
