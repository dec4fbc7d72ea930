use std::fmt;

use thiserror::Error;

/// Where a rejected record sits in its payload: CSV rows by line, JSON
/// records by their 1-based position in the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPosition {
    Line(usize),
    Index(usize),
}

impl fmt::Display for RecordPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(n) => write!(f, "record at line {n}"),
            Self::Index(n) => write!(f, "record #{n}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CrosscheckError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Selection {index} is out of range for a group of {len} members")]
    OutOfRangeSelection { index: i64, len: usize },

    #[error("Unknown file: {0}")]
    UnknownFile(String),

    #[error("Invalid {at}: {reason}")]
    InvalidRecord { at: RecordPosition, reason: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CrosscheckError>;
