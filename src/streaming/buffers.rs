//! Buffer size constants for streaming operations.
//!
//! These constants control memory usage vs I/O throughput tradeoffs.

/// Default output buffer size (2 MB) for each output log.
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Default input buffer size (256 KB) per source.
/// Merges keep one of these open per input file.
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Default line buffer capacity (1 KB).
/// Sufficient for most call lines.
pub const DEFAULT_LINE_BUFFER: usize = 1024;

/// Number of decoded records per read-ahead batch.
pub const READ_AHEAD_BATCH: usize = 256;

/// Number of batches a read-ahead channel holds before the decoder blocks.
/// Total prefetch per source = 256 * 16 = 4096 records.
pub const READ_AHEAD_CHANNEL: usize = 16;
