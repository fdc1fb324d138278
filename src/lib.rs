//! methmerge: k-way streaming merge of per-sample methylation calls
//!
//! Each input holds one sample's calls sorted by (chromosome, position).
//! The merge walks all inputs in lockstep and writes one index entry per
//! distinct position, followed by the calls of every sample covering it.
//! Index entries carry a value offset, so a reader can binary search a
//! position and jump straight to its calls.
//!
//! # Features
//!
//! - **Streaming**: O(k) memory in the number of inputs
//! - **Explicit exhaustion**: no sentinel chromosome labels
//! - **Pluggable output**: text logs or Parquet tables
//!
//! # Example
//!
//! ```rust
//! use methmerge::merge::MergeDriver;
//! use methmerge::sink::{write_merged, ColumnarSink};
//! use methmerge::streaming::MemorySource;
//!
//! let sources = vec![
//!     MemorySource::new(0, vec![("chr1", 1, 1, 2), ("chr1", 5, 3, 4)]),
//!     MemorySource::new(1, vec![("chr1", 1, 5, 6), ("chr2", 1, 7, 8)]),
//! ];
//! let mut sink = ColumnarSink::new();
//! let stats = write_merged(MergeDriver::new(sources).unwrap(), &mut sink).unwrap();
//!
//! assert_eq!(stats.positions_written, 3);
//! assert_eq!(sink.tables().value_offset, vec![0, 2, 3]);
//! ```

pub mod calls;
pub mod commands;
pub mod config;
pub mod error;
pub mod index;
pub mod merge;
pub mod position;
pub mod sink;
pub mod streaming;

// Re-export commonly used types
pub use calls::{open_input, CallReader};
pub use error::{MergeError, Result};
pub use index::PositionIndex;
pub use position::{Call, GroupedRecord, Position};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::calls::CallReader;
    pub use crate::commands::{LookupCommand, MergeCallsCommand};
    pub use crate::config::{ColumnNames, InputFormat, MergeStrategy, OutputFormat};
    pub use crate::error::{MergeError, Result};
    pub use crate::index::PositionIndex;
    pub use crate::merge::{HeapMergeDriver, MergeDriver, Merger};
    pub use crate::position::{Call, GroupedRecord, Position};
    pub use crate::sink::{write_merged, ColumnarSink, OutputSink, TextSink};
    pub use crate::streaming::{CallSource, MemorySource, SourceStream};
}
