//! Streaming sessionization of access logs.
//!
//! Events (client ip + timestamp, non-decreasing in time) are folded into one
//! open session per client. A session closes once some later, distinct
//! timestamp is more than the inactivity period past the client's last event,
//! or when the input ends.

pub mod config;
pub mod engine;
pub mod error;
pub mod log_discovery;
pub mod log_reader;
pub mod models;
pub mod parser;
pub mod processor;
pub mod progress_events;
pub mod session;
pub mod time_index;
pub mod writer;

pub use engine::{sessionize, Sessionizer};
pub use error::SessionizeError;
pub use models::{DurationMode, LogEvent, Session};
pub use processor::{Processor, RunSummary};
