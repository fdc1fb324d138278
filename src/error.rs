//! Error type shared by the reader, merge drivers, sinks and index.

use crate::position::Position;
use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::io;
use thiserror::Error;

/// Errors that can occur while reading, merging or persisting calls.
///
/// Every variant is fatal for a merge run: the drivers never skip a record,
/// since a dropped record would shift every value offset after it.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Read error on {input}: {error}")]
    SourceIo {
        input: String,
        #[source]
        error: io::Error,
    },

    #[error("Parse error in {input} at line {line}: {message}")]
    Parse {
        input: String,
        line: u64,
        message: String,
    },

    #[error("{input} is not sorted: {current} at line {line} does not come after {previous}")]
    OutOfOrder {
        input: String,
        line: u64,
        previous: Position,
        current: Position,
    },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
}

pub type Result<T> = std::result::Result<T, MergeError>;
