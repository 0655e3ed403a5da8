use thiserror::Error;

/// Error type for parsing coverage and intron track files.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Expected at least {expected} columns but found {found} in line: {line}")]
    ColumnCount {
        expected: usize,
        found: usize,
        line: String,
    },

    #[error("Can't parse {field} field: {value}")]
    NumericField { field: &'static str, value: String },

    #[error("Interval end {end} precedes start {start} in line: {line}")]
    InvertedInterval { start: u32, end: u32, line: String },

    #[error("Invalid strand symbol: {0}")]
    InvalidStrand(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for track parsing operations.
pub type Result<T> = std::result::Result<T, TrackError>;
