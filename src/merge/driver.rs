//! Linear-scan k-way merge driver.
//!
//! # Algorithm
//!
//! Each step:
//! 1. Find the minimum head position among non-exhausted streams
//! 2. Visit streams in index order; every stream whose head equals the
//!    minimum contributes its call and is advanced
//! 3. Emit the position with the collected calls
//!
//! A call's source index is the index of the stream it came from, whatever
//! the source itself stamped, so calls are always in ascending index order.
//!
//! When no stream has a head left the driver is done.
//!
//! # Complexity
//!
//! O(k) per step for k sources. Per-sample merges have tens of sources, so
//! the scan beats heap bookkeeping; see [`HeapMergeDriver`] for large k.
//!
//! [`HeapMergeDriver`]: super::heap::HeapMergeDriver

use crate::error::Result;
use crate::merge::MergeState;
use crate::position::{GroupedRecord, Position};
use crate::streaming::source::{CallSource, SourceStream};

/// Merges sorted call sources into grouped records by linear scan.
pub struct MergeDriver<S> {
    streams: Vec<SourceStream<S>>,
    state: MergeState,
}

impl<S: CallSource> MergeDriver<S> {
    /// Open every source and buffer its first record.
    ///
    /// With no sources (or only empty ones) the driver starts out done.
    pub fn new(sources: Vec<S>) -> Result<Self> {
        let streams = sources
            .into_iter()
            .map(SourceStream::open)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_streams(streams))
    }

    /// Like [`new`](Self::new), but every source is checked for strict
    /// position order while merging.
    pub fn new_checked(sources: Vec<S>) -> Result<Self> {
        let streams = sources
            .into_iter()
            .map(SourceStream::open_checked)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_streams(streams))
    }

    /// Build a driver from already opened streams.
    pub fn from_streams(streams: Vec<SourceStream<S>>) -> Self {
        let state = if streams.iter().all(|s| s.is_exhausted()) {
            MergeState::Done
        } else {
            MergeState::Running
        };
        Self { streams, state }
    }

    #[inline]
    pub fn state(&self) -> MergeState {
        self.state
    }

    /// Source streams in index order.
    pub fn streams(&self) -> &[SourceStream<S>] {
        &self.streams
    }

    /// Total records pulled from all sources so far.
    pub fn records_read(&self) -> u64 {
        self.streams.iter().map(|s| s.records_read()).sum()
    }

    /// Run one merge step.
    ///
    /// Returns `Ok(None)` once every stream is exhausted. Any stream error
    /// ends the merge: the error is returned and the driver is done.
    pub fn step(&mut self) -> Result<Option<GroupedRecord>> {
        if self.state == MergeState::Done {
            return Ok(None);
        }

        let curpos: Position = match self.streams.iter().filter_map(|s| s.peek()).min() {
            Some(p) => p.clone(),
            None => {
                self.state = MergeState::Done;
                return Ok(None);
            }
        };

        let mut calls = Vec::new();
        for (stream_idx, stream) in self.streams.iter_mut().enumerate() {
            if let Some(call) = stream.call_at(&curpos) {
                calls.push(call.with_source_index(stream_idx as u32));
                if let Err(e) = stream.advance() {
                    self.state = MergeState::Done;
                    return Err(e);
                }
            }
        }

        Ok(Some(GroupedRecord::new(curpos, calls)))
    }
}

impl<S: CallSource> Iterator for MergeDriver<S> {
    type Item = Result<GroupedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().transpose()
    }
}

impl<S: CallSource> std::iter::FusedIterator for MergeDriver<S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MergeError;
    use crate::position::Call;
    use crate::streaming::source::MemorySource;

    fn scenario_sources() -> Vec<MemorySource> {
        vec![
            MemorySource::new(0, vec![("chr1", 1, 1, 2), ("chr1", 5, 3, 4)]),
            MemorySource::new(1, vec![("chr1", 1, 5, 6), ("chr2", 1, 7, 8)]),
        ]
    }

    #[test]
    fn test_two_source_scenario() {
        let driver = MergeDriver::new(scenario_sources()).unwrap();
        let records: Vec<GroupedRecord> = driver.collect::<Result<_>>().unwrap();

        assert_eq!(
            records,
            vec![
                GroupedRecord::new(
                    Position::new("chr1", 1),
                    vec![Call::new(0, 1, 2), Call::new(1, 5, 6)]
                ),
                GroupedRecord::new(Position::new("chr1", 5), vec![Call::new(0, 3, 4)]),
                GroupedRecord::new(Position::new("chr2", 1), vec![Call::new(1, 7, 8)]),
            ]
        );
    }

    #[test]
    fn test_no_sources_is_done() {
        let mut driver = MergeDriver::<MemorySource>::new(Vec::new()).unwrap();
        assert_eq!(driver.state(), MergeState::Done);
        assert!(driver.step().unwrap().is_none());
    }

    #[test]
    fn test_all_empty_sources_done_at_construction() {
        let sources = vec![MemorySource::empty(0), MemorySource::empty(1), MemorySource::empty(2)];
        let mut driver = MergeDriver::new(sources).unwrap();
        assert_eq!(driver.state(), MergeState::Done);
        assert!(driver.next().is_none());
    }

    #[test]
    fn test_empty_source_among_others_is_skipped() {
        let sources = vec![
            MemorySource::new(0, vec![("chr1", 1, 1, 1)]),
            MemorySource::empty(1),
            MemorySource::new(2, vec![("chr1", 1, 2, 2), ("chr1", 9, 3, 3)]),
        ];
        let records: Vec<GroupedRecord> = MergeDriver::new(sources)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].calls, vec![Call::new(0, 1, 1), Call::new(2, 2, 2)]);
        assert!(records
            .iter()
            .flat_map(|r| &r.calls)
            .all(|c| c.source_index != 1));
    }

    #[test]
    fn test_all_sources_tie_on_every_position() {
        let sources: Vec<MemorySource> = (0..4)
            .map(|i| {
                MemorySource::new(i, vec![("chr1", 10, i as u64, 0), ("chr1", 20, 0, i as u64)])
            })
            .collect();
        let records: Vec<GroupedRecord> = MergeDriver::new(sources)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        for record in &records {
            let order: Vec<u32> = record.calls.iter().map(|c| c.source_index).collect();
            assert_eq!(order, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_source_index_follows_stream_order() {
        // Sources stamped out of order still come out in stream order
        let sources = vec![
            MemorySource::new(1, vec![("chr1", 1, 10, 0)]),
            MemorySource::new(0, vec![("chr1", 1, 20, 0)]),
            MemorySource::new(7, vec![("chr1", 2, 30, 0)]),
        ];
        let records: Vec<GroupedRecord> = MergeDriver::new(sources)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            records[0].calls,
            vec![Call::new(0, 10, 0), Call::new(1, 20, 0)]
        );
        assert_eq!(records[1].calls, vec![Call::new(2, 30, 0)]);
    }

    #[test]
    fn test_state_transitions_to_done() {
        let mut driver =
            MergeDriver::new(vec![MemorySource::new(0, vec![("chr1", 1, 0, 0)])]).unwrap();
        assert_eq!(driver.state(), MergeState::Running);
        assert!(driver.step().unwrap().is_some());
        assert!(driver.step().unwrap().is_none());
        assert_eq!(driver.state(), MergeState::Done);
        assert_eq!(driver.records_read(), 1);
    }

    #[test]
    fn test_checked_merge_fails_on_unsorted_source() {
        let sources = vec![
            MemorySource::new(0, vec![("chr1", 5, 0, 0), ("chr1", 2, 0, 0)]),
            MemorySource::new(1, vec![("chr1", 1, 0, 0)]),
        ];
        let mut driver = MergeDriver::new_checked(sources).unwrap();
        assert!(driver.next().unwrap().is_ok());
        let err = driver.next().unwrap().unwrap_err();
        assert!(matches!(err, MergeError::OutOfOrder { .. }));
        assert!(driver.next().is_none());
        assert_eq!(driver.state(), MergeState::Done);
    }
}
