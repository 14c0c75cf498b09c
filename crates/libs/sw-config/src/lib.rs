//! Configuration management for scanwatch.
//!
//! Every field has a default, so an empty or missing file yields a working
//! configuration that expects the scanner toolkit in the current directory.
//!
//! # Usage
//!
//! ```rust
//! use sw_config::ScanwatchConfig;
//!
//! let config = ScanwatchConfig::from_toml("[toolkit]\nroot = \"/opt/toolkit\"").unwrap();
//! assert_eq!(config.toolkit.entry_point.to_str(), Some("bounty.sh"));
//! ```

pub mod error;
pub mod prelude;
pub mod sw_config;

pub use sw_config::{EventLogWait, ScanwatchConfig, ServerConfig, TelemetryConfig, ToolkitConfig};
