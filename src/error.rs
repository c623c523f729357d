//! Error types for the sessionizer crate

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionizeError {
    /// Inactivity threshold missing or unusable
    #[error("invalid inactivity threshold in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// Input header lacks a required column
    #[error("input header has no '{0}' column")]
    MissingColumn(&'static str),

    /// A data row could not be turned into a log event
    #[error("line {line}: {reason}")]
    Parse { line: u64, reason: String },

    /// Session table and time index disagree about an open client
    #[error("no open session for client {0}")]
    UnknownClient(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SessionizeError {
    pub(crate) fn parse(line: u64, reason: impl Into<String>) -> Self {
        SessionizeError::Parse {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionizeError>;
