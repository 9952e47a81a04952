use thiserror::Error;

use crate::Timestamp;

/// The unified error type for the `timeseries_collection` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A negative count, a zero step, or positions outside an index.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// An index was requested with no usable timestamps.
    #[error("Cannot build an index with zero timestamps")]
    EmptyIndex,

    /// An observation refers to a timestamp the target index does not contain.
    #[error("Observation for key {key:?} has timestamp {timestamp} which is not in the index")]
    UnknownTimestamp { key: String, timestamp: Timestamp },

    /// Persisted rows (or tagged entries) disagree with the shared index descriptor.
    #[error("Index mismatch: {0}")]
    IndexMismatch(String),

    /// A vector's length does not match the length it must align to.
    #[error("Series {key:?} has {actual} values but the index has {expected} positions")]
    DimensionMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },

    /// The same (key, timestamp) pair appeared twice while rebuilding series.
    #[error("Duplicate observation for key {key:?} at {timestamp}")]
    DuplicateObservation { key: String, timestamp: Timestamp },

    /// A named column is absent from a table.
    #[error("Column {0:?} not found")]
    MissingColumn(String),

    /// A table cell does not hold the type the column requires.
    #[error("Column {column:?} expected {expected} values")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    /// Malformed text (timestamps, frequency descriptors, numbers).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Refusing to overwrite previously saved data.
    #[error("Destination {0} already exists and is not empty")]
    AlreadyExists(std::path::PathBuf),

    /// A generic I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// An error from the CSV reader or writer.
    #[error("CSV error")]
    Csv(#[from] csv::Error),

    /// An error encoding or decoding the index descriptor.
    #[error("Index descriptor encoding failed")]
    Bincode(#[from] bincode::Error),

    /// The worker pool could not be created.
    #[error("Failed to build thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
