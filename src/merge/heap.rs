//! Heap-based k-way merge driver.
//!
//! Same contract and output as [`MergeDriver`](super::driver::MergeDriver),
//! but heads live in a min-heap keyed by (position, source index), so each
//! call costs O(log k) instead of a full scan. Popping every entry equal to
//! the minimum yields the tied sources in ascending index order.

use crate::error::Result;
use crate::merge::MergeState;
use crate::position::{GroupedRecord, Position};
use crate::streaming::source::{CallSource, SourceStream};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Wrapper for min-heap (BinaryHeap is max-heap by default).
#[derive(Debug, Clone, Eq, PartialEq)]
struct HeapEntry {
    position: Position,
    stream_idx: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .position
            .cmp(&self.position)
            .then(other.stream_idx.cmp(&self.stream_idx))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Merges sorted call sources into grouped records with a binary heap.
pub struct HeapMergeDriver<S> {
    streams: Vec<SourceStream<S>>,
    heap: BinaryHeap<HeapEntry>,
    tied: Vec<usize>,
    state: MergeState,
}

impl<S: CallSource> HeapMergeDriver<S> {
    /// Open every source and buffer its first record.
    pub fn new(sources: Vec<S>) -> Result<Self> {
        let streams = sources
            .into_iter()
            .map(SourceStream::open)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_streams(streams))
    }

    /// Like [`new`](Self::new), with strict order checking on every source.
    pub fn new_checked(sources: Vec<S>) -> Result<Self> {
        let streams = sources
            .into_iter()
            .map(SourceStream::open_checked)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_streams(streams))
    }

    /// Build a driver from already opened streams.
    pub fn from_streams(streams: Vec<SourceStream<S>>) -> Self {
        let mut heap = BinaryHeap::with_capacity(streams.len());
        for (stream_idx, stream) in streams.iter().enumerate() {
            if let Some(position) = stream.peek() {
                heap.push(HeapEntry {
                    position: position.clone(),
                    stream_idx,
                });
            }
        }
        let state = if heap.is_empty() {
            MergeState::Done
        } else {
            MergeState::Running
        };
        Self {
            tied: Vec::with_capacity(streams.len()),
            streams,
            heap,
            state,
        }
    }

    #[inline]
    pub fn state(&self) -> MergeState {
        self.state
    }

    pub fn streams(&self) -> &[SourceStream<S>] {
        &self.streams
    }

    pub fn records_read(&self) -> u64 {
        self.streams.iter().map(|s| s.records_read()).sum()
    }

    /// Run one merge step; see [`MergeDriver::step`](super::driver::MergeDriver::step).
    pub fn step(&mut self) -> Result<Option<GroupedRecord>> {
        if self.state == MergeState::Done {
            return Ok(None);
        }

        let first = match self.heap.pop() {
            Some(entry) => entry,
            None => {
                self.state = MergeState::Done;
                return Ok(None);
            }
        };
        let curpos = first.position;

        self.tied.clear();
        self.tied.push(first.stream_idx);
        while self.heap.peek().is_some_and(|e| e.position == curpos) {
            if let Some(entry) = self.heap.pop() {
                self.tied.push(entry.stream_idx);
            }
        }

        let mut calls = Vec::with_capacity(self.tied.len());
        for &stream_idx in &self.tied {
            let stream = &mut self.streams[stream_idx];
            if let Some(call) = stream.call_at(&curpos) {
                calls.push(call.with_source_index(stream_idx as u32));
                if let Err(e) = stream.advance() {
                    self.state = MergeState::Done;
                    return Err(e);
                }
            }
            if let Some(position) = stream.peek() {
                self.heap.push(HeapEntry {
                    position: position.clone(),
                    stream_idx,
                });
            }
        }

        Ok(Some(GroupedRecord::new(curpos, calls)))
    }
}

impl<S: CallSource> Iterator for HeapMergeDriver<S> {
    type Item = Result<GroupedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().transpose()
    }
}

impl<S: CallSource> std::iter::FusedIterator for HeapMergeDriver<S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::driver::MergeDriver;
    use crate::position::Call;
    use crate::streaming::source::MemorySource;

    #[test]
    fn test_heap_entry_min_order() {
        let mut heap = BinaryHeap::new();
        for (major, minor, stream_idx) in [("chr2", 1, 0), ("chr1", 9, 3), ("chr1", 9, 1)] {
            heap.push(HeapEntry {
                position: Position::new(major, minor),
                stream_idx,
            });
        }
        assert_eq!(heap.pop().unwrap().stream_idx, 1);
        assert_eq!(heap.pop().unwrap().stream_idx, 3);
        assert_eq!(heap.pop().unwrap().stream_idx, 0);
    }

    #[test]
    fn test_heap_scenario_offsets() {
        let sources = vec![
            MemorySource::new(0, vec![("chr1", 1, 1, 2), ("chr1", 5, 3, 4)]),
            MemorySource::new(1, vec![("chr1", 1, 5, 6), ("chr2", 1, 7, 8)]),
        ];
        let records: Vec<GroupedRecord> = HeapMergeDriver::new(sources)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].calls, vec![Call::new(0, 1, 2), Call::new(1, 5, 6)]);
        assert_eq!(records[1].position, Position::new("chr1", 5));
        assert_eq!(records[2].calls, vec![Call::new(1, 7, 8)]);
    }

    #[test]
    fn test_heap_matches_linear_with_ties() {
        let make = || {
            vec![
                MemorySource::new(0, vec![("chr1", 3, 1, 0), ("chr1", 7, 1, 0), ("chrX", 2, 1, 0)]),
                MemorySource::empty(1),
                MemorySource::new(2, vec![("chr1", 3, 2, 0), ("chr10", 1, 2, 0)]),
                MemorySource::new(3, vec![("chr1", 7, 3, 0), ("chrX", 2, 3, 0)]),
            ]
        };
        let linear: Vec<GroupedRecord> = MergeDriver::new(make())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        let heap: Vec<GroupedRecord> = HeapMergeDriver::new(make())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(linear, heap);
    }

    #[test]
    fn test_heap_restamps_source_index() {
        let make = || {
            vec![
                MemorySource::new(5, vec![("chr1", 1, 1, 0), ("chr2", 1, 1, 0)]),
                MemorySource::new(0, vec![("chr1", 1, 2, 0)]),
            ]
        };
        let heap: Vec<GroupedRecord> = HeapMergeDriver::new(make())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(heap[0].calls, vec![Call::new(0, 1, 0), Call::new(1, 2, 0)]);
        assert_eq!(heap[1].calls, vec![Call::new(0, 1, 0)]);

        let linear: Vec<GroupedRecord> = MergeDriver::new(make())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(linear, heap);
    }

    #[test]
    fn test_heap_empty_inputs() {
        let mut driver = HeapMergeDriver::new(vec![MemorySource::empty(0)]).unwrap();
        assert_eq!(driver.state(), MergeState::Done);
        assert!(driver.next().is_none());
    }
}
