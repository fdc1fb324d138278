//! K-way merge of sorted call sources into grouped records.
//!
//! Two interchangeable drivers produce identical output:
//! - [`MergeDriver`]: linear scan over heads, O(k) per step
//! - [`HeapMergeDriver`]: binary heap of heads, O(log k) per call
//!
//! [`Merger`] picks one from a [`MergeStrategy`].
//!
//! Both emit one [`GroupedRecord`] per distinct position, in strictly
//! increasing position order, with calls in ascending source index.
//!
//! REQUIREMENT: every source must be sorted by (chromosome, position) under
//! the same lexicographic chromosome order. This is not validated unless a
//! checked driver is requested.

pub mod driver;
pub mod heap;

pub use driver::MergeDriver;
pub use heap::HeapMergeDriver;

use crate::config::MergeStrategy;
use crate::error::Result;
use crate::position::GroupedRecord;
use crate::streaming::source::CallSource;

/// Driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    Running,
    Done,
}

/// A merge driver chosen at runtime.
pub enum Merger<S> {
    Linear(MergeDriver<S>),
    Heap(HeapMergeDriver<S>),
}

impl<S: CallSource> Merger<S> {
    /// Open `sources` with the driver `strategy` resolves to.
    pub fn open(sources: Vec<S>, strategy: MergeStrategy, check_order: bool) -> Result<Self> {
        let merger = match (strategy.resolve(sources.len()), check_order) {
            (MergeStrategy::Heap, false) => Merger::Heap(HeapMergeDriver::new(sources)?),
            (MergeStrategy::Heap, true) => Merger::Heap(HeapMergeDriver::new_checked(sources)?),
            (_, false) => Merger::Linear(MergeDriver::new(sources)?),
            (_, true) => Merger::Linear(MergeDriver::new_checked(sources)?),
        };
        Ok(merger)
    }

    pub fn state(&self) -> MergeState {
        match self {
            Merger::Linear(d) => d.state(),
            Merger::Heap(d) => d.state(),
        }
    }

    /// Total records pulled from all sources so far.
    pub fn records_read(&self) -> u64 {
        match self {
            Merger::Linear(d) => d.records_read(),
            Merger::Heap(d) => d.records_read(),
        }
    }

    pub fn strategy(&self) -> MergeStrategy {
        match self {
            Merger::Linear(_) => MergeStrategy::Linear,
            Merger::Heap(_) => MergeStrategy::Heap,
        }
    }
}

impl<S: CallSource> Iterator for Merger<S> {
    type Item = Result<GroupedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Merger::Linear(d) => d.next(),
            Merger::Heap(d) => d.next(),
        }
    }
}
