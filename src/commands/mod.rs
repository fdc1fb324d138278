//! Command implementations for methmerge.

pub mod lookup;
pub mod merge_calls;

pub use lookup::LookupCommand;
pub use merge_calls::{collect_inputs, MergeCallsCommand, DEFAULT_INPUT_SUFFIX};
