//! Shared data model for scanwatch.
//!
//! Holds the types that cross crate boundaries: launch requests, raw output
//! lines, structured phase records, historical job records and the messages
//! pushed over the live channel.
//!
//! # Usage
//!
//! ```rust
//! use sw_models::job::{JobRequest, ScanMode};
//!
//! let request = JobRequest::new("example.com", None);
//! let target = request.validate().unwrap();
//! assert_eq!(target.mode, ScanMode::Standard);
//! ```

pub mod error;
pub mod job;
pub mod live;
pub mod output;
pub mod phase;
pub mod prelude;
pub mod record;
