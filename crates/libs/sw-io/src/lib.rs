//! Process execution and output handling for scanwatch.
//!
//! Spawns the external scanner with piped output, splits each stream into
//! classified lines and reports the exit code once both streams are drained.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sw_io::runner::{RunEvent, Runner};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> sw_io::prelude::Result<()> {
//! let runner = Runner::new("bash", vec!["bounty.sh", "-d", "example.com", "-m", "fast"]);
//! let (tx, mut rx) = mpsc::channel(64);
//! let _handle = runner.spawn(tx)?;
//!
//! while let Some(event) = rx.recv().await {
//!     match event {
//!         RunEvent::Line(line) => println!("{}: {}", line.stream, line.text),
//!         RunEvent::End(code) => println!("exited with {:?}", code),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod demux;
pub mod error;
pub mod prelude;
pub mod process;
pub mod runner;
