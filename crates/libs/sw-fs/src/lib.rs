//! Filesystem side of scanwatch.
//!
//! The scanner writes one folder per job under an output root. This crate
//! reads that layout back:
//!
//! - [`index`] lists job folders and parses their names.
//! - [`stats`] counts lines in a job's artifact files.
//! - [`events`] reads a job's event log in one go.
//! - [`correlator`] waits for the folder of a freshly launched job.
//! - [`tail`] follows a growing event log, reading only appended bytes.
//! - [`watch`] turns `notify` callbacks into coalesced wake-ups.

pub mod correlator;
pub mod error;
pub mod events;
pub mod index;
pub mod layout;
pub mod prelude;
pub mod stats;
pub mod tail;
pub mod watch;
