//! Output sinks for merged calls.
//!
//! A sink receives, for every grouped record, one index entry followed by
//! that record's value rows. The index entry carries the record's value
//! offset: the number of value rows written before it. A reader can binary
//! search the index for a position and jump straight to its value rows,
//! which are contiguous and end where the next entry's offset begins.
//!
//! [`write_merged`] is the only producer of offsets, so every sink sees the
//! same layout.

pub mod columnar;
pub mod text;

pub use columnar::{ColumnarSink, ColumnarTables};
pub use text::TextSink;

use crate::error::Result;
use crate::position::{Call, GroupedRecord, Position};
use std::fmt;

/// Destination for the position index and value rows of a merge.
pub trait OutputSink {
    /// Record that `position`'s value rows start at `value_offset`.
    fn write_index_entry(&mut self, position: &Position, value_offset: u64) -> Result<()>;

    /// Append one value row.
    fn write_value_row(&mut self, call: &Call) -> Result<()>;

    /// Flush or persist everything written so far.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Counters for one merge run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Number of sources merged
    pub sources: usize,
    /// Number of call records read across all sources
    pub records_read: u64,
    /// Number of index entries (distinct positions) written
    pub positions_written: u64,
    /// Number of value rows written
    pub values_written: u64,
    /// Sum of both counts over every value row
    pub reads_written: u64,
    /// Largest number of calls grouped at one position
    pub max_calls_per_position: usize,
}

impl MergeStats {
    /// Mean number of sources reporting each position.
    pub fn mean_calls_per_position(&self) -> f64 {
        if self.positions_written == 0 {
            0.0
        } else {
            self.values_written as f64 / self.positions_written as f64
        }
    }
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sources: {}, Read: {}, Positions: {}, Values: {}, Reads: {}, Calls/position: {:.2} (max {})",
            self.sources,
            self.records_read,
            self.positions_written,
            self.values_written,
            self.reads_written,
            self.mean_calls_per_position(),
            self.max_calls_per_position
        )
    }
}

/// Drain grouped records into a sink, then finish it.
///
/// Errors from the record stream are returned as-is; whatever the sink had
/// written by then is left unfinished.
pub fn write_merged<I, K>(records: I, sink: &mut K) -> Result<MergeStats>
where
    I: IntoIterator<Item = Result<GroupedRecord>>,
    K: OutputSink + ?Sized,
{
    let mut stats = MergeStats::default();
    let mut value_offset: u64 = 0;

    for record in records {
        let record = record?;
        debug_assert!(!record.is_empty(), "grouped record at {} has no calls", record.position);
        sink.write_index_entry(&record.position, value_offset)?;
        for call in &record.calls {
            sink.write_value_row(call)?;
            stats.reads_written += call.depth();
        }
        value_offset += record.len() as u64;
        stats.positions_written += 1;
        stats.max_calls_per_position = stats.max_calls_per_position.max(record.len());
    }

    stats.values_written = value_offset;
    stats.records_read = value_offset;
    sink.finish()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MergeError;
    use crate::merge::MergeDriver;
    use crate::streaming::source::MemorySource;

    /// Records every sink call in order.
    #[derive(Default)]
    struct RecordingSink {
        index: Vec<(Position, u64)>,
        values: Vec<Call>,
        finished: bool,
    }

    impl OutputSink for RecordingSink {
        fn write_index_entry(&mut self, position: &Position, value_offset: u64) -> Result<()> {
            // Each entry must land exactly at the current value row count
            assert_eq!(value_offset, self.values.len() as u64);
            self.index.push((position.clone(), value_offset));
            Ok(())
        }

        fn write_value_row(&mut self, call: &Call) -> Result<()> {
            self.values.push(*call);
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn test_scenario_offsets() {
        let sources = vec![
            MemorySource::new(0, vec![("chr1", 1, 1, 2), ("chr1", 5, 3, 4)]),
            MemorySource::new(1, vec![("chr1", 1, 5, 6), ("chr2", 1, 7, 8)]),
        ];
        let mut sink = RecordingSink::default();
        let stats = write_merged(MergeDriver::new(sources).unwrap(), &mut sink).unwrap();

        let offsets: Vec<u64> = sink.index.iter().map(|(_, o)| *o).collect();
        assert_eq!(offsets, vec![0, 2, 3]);
        assert_eq!(sink.values.len(), 4);
        assert!(sink.finished);
        assert_eq!(stats.positions_written, 3);
        assert_eq!(stats.values_written, 4);
        assert_eq!(stats.max_calls_per_position, 2);
        assert_eq!(stats.reads_written, 36);
    }

    #[test]
    fn test_empty_merge_writes_nothing() {
        let mut sink = RecordingSink::default();
        let stats = write_merged(
            MergeDriver::new(vec![MemorySource::empty(0), MemorySource::empty(1)]).unwrap(),
            &mut sink,
        )
        .unwrap();
        assert!(sink.index.is_empty());
        assert!(sink.values.is_empty());
        assert!(sink.finished);
        assert_eq!(stats, MergeStats::default());
    }

    #[test]
    fn test_error_stops_before_finish() {
        let records = vec![
            Ok(GroupedRecord::new(Position::new("chr1", 1), vec![Call::new(0, 1, 1)])),
            Err(MergeError::InvalidFormat("boom".into())),
        ];
        let mut sink = RecordingSink::default();
        assert!(write_merged(records, &mut sink).is_err());
        assert_eq!(sink.index.len(), 1);
        assert!(!sink.finished);
    }

    #[test]
    fn test_stats_display() {
        let stats = MergeStats {
            sources: 2,
            records_read: 4,
            positions_written: 3,
            values_written: 4,
            reads_written: 36,
            max_calls_per_position: 2,
        };
        assert_eq!(
            stats.to_string(),
            "Sources: 2, Read: 4, Positions: 3, Values: 4, Reads: 36, Calls/position: 1.33 (max 2)"
        );
    }
}
