//! Sort validation for call sources.
//!
//! The merge requires every source to yield strictly increasing positions
//! under the (chromosome, position) order of [`Position`]. It does not check
//! this by default; these helpers let a caller opt in, either inline while
//! merging or as a separate pass over a source.

use crate::error::{MergeError, Result};
use crate::position::Position;
use crate::streaming::source::CallSource;

/// Inline sort validator for use within streaming loops.
///
/// Validates that positions are strictly increasing. Since chromosome labels
/// compare lexicographically, this also rejects interleaved chromosomes
/// (`chr1, chr2, chr1`).
#[derive(Debug, Default)]
pub struct OrderValidator {
    previous: Option<Position>,
    record_count: u64,
}

impl OrderValidator {
    /// Create a new order validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate that `position` comes strictly after the previous one.
    ///
    /// On failure returns the previous position; the validator keeps its
    /// state so the error can be reported with both positions.
    #[inline]
    pub fn validate(&mut self, position: &Position) -> std::result::Result<(), Position> {
        if let Some(ref prev) = self.previous {
            if position <= prev {
                return Err(prev.clone());
            }
        }
        self.record_count += 1;
        self.previous = Some(position.clone());
        Ok(())
    }

    /// Number of records validated so far.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }
}

/// Drain a source and verify it is strictly sorted.
///
/// Returns the number of records on success.
pub fn verify_sorted<S: CallSource>(source: &mut S) -> Result<u64> {
    let mut validator = OrderValidator::new();
    while let Some((position, _)) = source.next_call()? {
        if let Err(previous) = validator.validate(&position) {
            return Err(MergeError::OutOfOrder {
                input: source.describe(),
                line: source.line_number(),
                previous,
                current: position,
            });
        }
    }
    Ok(validator.record_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::source::MemorySource;

    #[test]
    fn test_validator_accepts_increasing() {
        let mut v = OrderValidator::new();
        assert!(v.validate(&Position::new("chr1", 1)).is_ok());
        assert!(v.validate(&Position::new("chr1", 2)).is_ok());
        assert!(v.validate(&Position::new("chr2", 1)).is_ok());
        assert_eq!(v.record_count(), 3);
    }

    #[test]
    fn test_validator_rejects_duplicate_and_inversion() {
        let mut v = OrderValidator::new();
        v.validate(&Position::new("chr1", 5)).unwrap();
        assert_eq!(
            v.validate(&Position::new("chr1", 5)),
            Err(Position::new("chr1", 5))
        );
        assert_eq!(
            v.validate(&Position::new("chr1", 4)),
            Err(Position::new("chr1", 5))
        );
    }

    #[test]
    fn test_validator_rejects_interleaved_chromosomes() {
        let mut v = OrderValidator::new();
        v.validate(&Position::new("chr1", 1)).unwrap();
        v.validate(&Position::new("chr2", 1)).unwrap();
        assert!(v.validate(&Position::new("chr1", 9)).is_err());
    }

    #[test]
    fn test_verify_sorted() {
        let mut sorted = MemorySource::new(0, vec![("chr1", 1, 0, 0), ("chr1", 3, 0, 0)]);
        assert_eq!(verify_sorted(&mut sorted).unwrap(), 2);

        let mut unsorted = MemorySource::new(1, vec![("chr2", 1, 0, 0), ("chr1", 3, 0, 0)]);
        let err = verify_sorted(&mut unsorted).unwrap_err();
        assert!(matches!(err, MergeError::OutOfOrder { line: 2, .. }));
    }
}
