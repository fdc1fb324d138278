//! Source streams: one buffered head per sorted call source.
//!
//! A [`CallSource`] is anything that yields `(Position, Call)` pairs in
//! ascending position order. [`SourceStream`] wraps one source and keeps
//! its current head, which is either a ready record or
//! [`Head::Exhausted`]. Exhaustion is an explicit state rather than a
//! sentinel position, so it can never compare equal to, or below, a real
//! chromosome label.

use crate::error::{MergeError, Result};
use crate::position::{Call, Position};
use crate::streaming::validation::OrderValidator;
use log::debug;
use std::sync::Arc;

/// A finite, non-restartable sequence of calls sorted by position.
pub trait CallSource {
    /// Pull the next record, or `None` once the source is drained.
    fn next_call(&mut self) -> Result<Option<(Position, Call)>>;

    /// Human-readable name for logs and error messages.
    fn describe(&self) -> String {
        "call source".to_string()
    }

    /// Line (or record) number of the last record pulled.
    fn line_number(&self) -> u64 {
        0
    }
}

impl<S: CallSource + ?Sized> CallSource for Box<S> {
    fn next_call(&mut self) -> Result<Option<(Position, Call)>> {
        (**self).next_call()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn line_number(&self) -> u64 {
        (**self).line_number()
    }
}

/// An in-memory call source.
#[derive(Debug)]
pub struct MemorySource {
    source_index: u32,
    records: std::vec::IntoIter<(Position, Call)>,
    pulled: u64,
}

impl MemorySource {
    /// Build a source from `(chrom, pos, count_a, count_b)` tuples.
    pub fn new<M, I>(source_index: u32, records: I) -> Self
    where
        M: Into<Arc<str>>,
        I: IntoIterator<Item = (M, u64, u64, u64)>,
    {
        let records: Vec<(Position, Call)> = records
            .into_iter()
            .map(|(major, minor, a, b)| {
                (
                    Position::new(major, minor),
                    Call::new(source_index, a, b),
                )
            })
            .collect();
        Self {
            source_index,
            records: records.into_iter(),
            pulled: 0,
        }
    }

    /// An empty source.
    pub fn empty(source_index: u32) -> Self {
        Self::new::<&str, _>(source_index, Vec::new())
    }
}

impl CallSource for MemorySource {
    fn next_call(&mut self) -> Result<Option<(Position, Call)>> {
        let next = self.records.next();
        if next.is_some() {
            self.pulled += 1;
        }
        Ok(next)
    }

    fn describe(&self) -> String {
        format!("memory source {}", self.source_index)
    }

    fn line_number(&self) -> u64 {
        self.pulled
    }
}

/// The buffered head of a source stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Ready { position: Position, call: Call },
    Exhausted,
}

/// One source plus its current head. Owned by a merge driver.
#[derive(Debug)]
pub struct SourceStream<S> {
    source: S,
    head: Head,
    validator: Option<OrderValidator>,
    records_read: u64,
}

impl<S: CallSource> SourceStream<S> {
    /// Wrap a source and buffer its first record.
    ///
    /// A source with no records is exhausted from the start.
    pub fn open(source: S) -> Result<Self> {
        Self::open_with(source, false)
    }

    /// Like [`open`](Self::open), but fail with [`MergeError::OutOfOrder`]
    /// as soon as the source yields a position that is not strictly greater
    /// than the previous one.
    pub fn open_checked(source: S) -> Result<Self> {
        Self::open_with(source, true)
    }

    fn open_with(source: S, check_order: bool) -> Result<Self> {
        let mut stream = Self {
            source,
            head: Head::Exhausted,
            validator: check_order.then(OrderValidator::new),
            records_read: 0,
        };
        stream.pull()?;
        Ok(stream)
    }

    #[inline]
    pub fn head(&self) -> &Head {
        &self.head
    }

    /// Position of the current head, `None` once exhausted.
    #[inline]
    pub fn peek(&self) -> Option<&Position> {
        match &self.head {
            Head::Ready { position, .. } => Some(position),
            Head::Exhausted => None,
        }
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        matches!(self.head, Head::Exhausted)
    }

    /// The head's call, if the head sits exactly at `position`.
    #[inline]
    pub fn call_at(&self, position: &Position) -> Option<Call> {
        match &self.head {
            Head::Ready { position: p, call } if p == position => Some(*call),
            _ => None,
        }
    }

    /// Replace the head with the source's next record.
    ///
    /// Once the source is drained the stream is exhausted for good. The
    /// caller must check [`is_exhausted`](Self::is_exhausted) first; advancing
    /// an exhausted stream is a no-op in release builds.
    pub fn advance(&mut self) -> Result<()> {
        debug_assert!(
            !self.is_exhausted(),
            "advance() called on exhausted {}",
            self.source.describe()
        );
        if self.is_exhausted() {
            return Ok(());
        }
        self.pull()
    }

    fn pull(&mut self) -> Result<()> {
        // An error leaves the stream exhausted
        self.head = Head::Exhausted;
        match self.source.next_call()? {
            Some((position, call)) => {
                if let Some(validator) = self.validator.as_mut() {
                    if let Err(previous) = validator.validate(&position) {
                        return Err(MergeError::OutOfOrder {
                            input: self.source.describe(),
                            line: self.source.line_number(),
                            previous,
                            current: position,
                        });
                    }
                }
                self.records_read += 1;
                self.head = Head::Ready { position, call };
            }
            None => {
                debug!(
                    "{} exhausted after {} records",
                    self.source.describe(),
                    self.records_read
                );
            }
        }
        Ok(())
    }

    /// Records pulled from the source so far, including the current head.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_buffers_first_record() {
        let src = MemorySource::new(0, vec![("chr1", 1, 1, 2), ("chr1", 5, 3, 4)]);
        let stream = SourceStream::open(src).unwrap();
        assert_eq!(stream.peek(), Some(&Position::new("chr1", 1)));
        assert_eq!(stream.records_read(), 1);
        assert!(!stream.is_exhausted());
    }

    #[test]
    fn test_empty_source_is_exhausted_at_open() {
        let stream = SourceStream::open(MemorySource::empty(2)).unwrap();
        assert!(stream.is_exhausted());
        assert_eq!(stream.peek(), None);
        assert_eq!(stream.head(), &Head::Exhausted);
    }

    #[test]
    fn test_advance_until_exhausted() {
        let src = MemorySource::new(0, vec![("chr1", 1, 1, 2), ("chr1", 5, 3, 4)]);
        let mut stream = SourceStream::open(src).unwrap();
        stream.advance().unwrap();
        assert_eq!(
            stream.head(),
            &Head::Ready {
                position: Position::new("chr1", 5),
                call: Call::new(0, 3, 4)
            }
        );
        stream.advance().unwrap();
        assert!(stream.is_exhausted());
        assert_eq!(stream.records_read(), 2);
    }

    #[test]
    fn test_call_at() {
        let src = MemorySource::new(4, vec![("chr1", 1, 7, 8)]);
        let stream = SourceStream::open(src).unwrap();
        assert_eq!(
            stream.call_at(&Position::new("chr1", 1)),
            Some(Call::new(4, 7, 8))
        );
        assert_eq!(stream.call_at(&Position::new("chr1", 2)), None);
    }

    #[test]
    fn test_checked_stream_rejects_unsorted() {
        let src = MemorySource::new(0, vec![("chr2", 1, 0, 0), ("chr1", 1, 0, 0)]);
        let mut stream = SourceStream::open_checked(src).unwrap();
        let err = stream.advance().unwrap_err();
        match err {
            MergeError::OutOfOrder {
                previous, current, ..
            } => {
                assert_eq!(previous, Position::new("chr2", 1));
                assert_eq!(current, Position::new("chr1", 1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unchecked_stream_accepts_unsorted() {
        let src = MemorySource::new(0, vec![("chr2", 1, 0, 0), ("chr1", 1, 0, 0)]);
        let mut stream = SourceStream::open(src).unwrap();
        stream.advance().unwrap();
        assert_eq!(stream.peek(), Some(&Position::new("chr1", 1)));
    }

    #[test]
    fn test_boxed_source() {
        let src: Box<dyn CallSource> = Box::new(MemorySource::new(1, vec![("chr1", 1, 0, 0)]));
        let stream = SourceStream::open(src).unwrap();
        assert_eq!(stream.describe(), "memory source 1");
    }
}
