//! Streaming building blocks shared by the merge drivers.
//!
//! - Zero-allocation call line parsing
//! - Source streams with an explicit exhausted state
//! - Background read-ahead decoding
//! - Sort validation
//! - Buffered log output
//!
//! A merge holds one buffered record per source, so memory is O(k) in the
//! number of sources regardless of input size.

pub mod buffers;
pub mod output;
pub mod parsing;
pub mod read_ahead;
pub mod source;
pub mod validation;

pub use output::LogWriter;
pub use parsing::{parse_u64_fast, should_skip_line, split_tab_fields, trim_line_end};
pub use read_ahead::ReadAheadSource;
pub use source::{CallSource, Head, MemorySource, SourceStream};
pub use validation::{verify_sorted, OrderValidator};
