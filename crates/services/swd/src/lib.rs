//! scanwatch daemon (swd)
//!
//! Launches the external scanner on request and streams what it does to every
//! connected viewer:
//!
//! - **API**: launch scans, list past scans with their stats, fetch reports and
//!   event logs
//! - **Live channel**: WebSocket fan-out of console lines, phase events and
//!   lifecycle transitions
//! - **Coordinator**: owns each launch from spawn to teardown

pub mod api;
pub mod cli;
pub mod coordinator;
pub mod error;
pub mod hub;
pub mod index_watcher;
pub mod live;
pub mod prelude;
pub mod state;
