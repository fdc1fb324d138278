//! Core key and payload types: genomic positions, per-source calls and the
//! grouped records produced by a merge.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A single-base genomic coordinate: chromosome label plus position.
///
/// Positions order by chromosome label (byte-wise lexicographic) and then
/// numerically by position. The label is reference counted so that a
/// reader can hand out the same allocation for every record on a
/// chromosome.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    major: Arc<str>,
    minor: u64,
}

impl Position {
    /// Create a new position.
    #[inline]
    pub fn new(major: impl Into<Arc<str>>, minor: u64) -> Self {
        Self {
            major: major.into(),
            minor,
        }
    }

    /// Chromosome label.
    #[inline]
    pub fn major(&self) -> &str {
        &self.major
    }

    /// Shared handle on the chromosome label.
    #[inline]
    pub fn major_arc(&self) -> &Arc<str> {
        &self.major
    }

    /// Coordinate within the chromosome.
    #[inline]
    pub fn minor(&self) -> u64 {
        self.minor
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .as_bytes()
            .cmp(other.major.as_bytes())
            .then(self.minor.cmp(&other.minor))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Read counts reported by one source at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Call {
    /// Index of the source (input file) the call came from.
    pub source_index: u32,
    /// First count column (unmethylated reads by default).
    pub count_a: u64,
    /// Second count column (methylated reads by default).
    pub count_b: u64,
}

impl Call {
    #[inline]
    pub fn new(source_index: u32, count_a: u64, count_b: u64) -> Self {
        Self {
            source_index,
            count_a,
            count_b,
        }
    }

    /// The same counts attributed to another source.
    #[inline]
    pub fn with_source_index(self, source_index: u32) -> Self {
        Self {
            source_index,
            ..self
        }
    }

    /// Total reads covering the position in this source.
    #[inline]
    pub fn depth(&self) -> u64 {
        self.count_a.saturating_add(self.count_b)
    }
}

/// All calls found at one position, in ascending source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedRecord {
    pub position: Position,
    pub calls: Vec<Call>,
}

impl GroupedRecord {
    pub fn new(position: Position, calls: Vec<Call>) -> Self {
        Self { position, calls }
    }

    /// Number of sources with a call at this position.
    #[inline]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
