//! Position index over a finished merge output.
//!
//! Loads the position log and value rows of a merge (text or Parquet) and
//! answers "which sources have a call here, and with what counts" by binary
//! search on positions followed by a jump to the value offset.

use crate::error::{MergeError, Result};
use crate::position::{Call, Position};
use crate::sink::columnar::ColumnarTables;
use crate::sink::text::text_paths;
use crate::streaming::parsing::{parse_u64_fast, trim_line_end};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Sorted positions with the offset of each position's value rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    positions: Vec<Position>,
    offsets: Vec<u64>,
    values: Vec<Call>,
}

impl PositionIndex {
    /// Build an index, checking the offset layout.
    ///
    /// Positions must be strictly increasing; offsets must start at 0, never
    /// decrease, and stay within the value rows.
    pub fn new(positions: Vec<Position>, offsets: Vec<u64>, values: Vec<Call>) -> Result<Self> {
        if positions.len() != offsets.len() {
            return Err(MergeError::InvalidFormat(format!(
                "{} positions but {} offsets",
                positions.len(),
                offsets.len()
            )));
        }
        if let Some(&first) = offsets.first() {
            if first != 0 {
                return Err(MergeError::InvalidFormat(format!(
                    "first value offset is {}, expected 0",
                    first
                )));
            }
        }
        for (i, pair) in offsets.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(MergeError::InvalidFormat(format!(
                    "value offset decreases at position row {}: {} -> {}",
                    i + 1,
                    pair[0],
                    pair[1]
                )));
            }
        }
        if let Some(&last) = offsets.last() {
            if last > values.len() as u64 {
                return Err(MergeError::InvalidFormat(format!(
                    "value offset {} is past the {} value rows",
                    last,
                    values.len()
                )));
            }
        }
        for (i, pair) in positions.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(MergeError::InvalidFormat(format!(
                    "positions not strictly increasing at row {}: {} then {}",
                    i + 1,
                    pair[0],
                    pair[1]
                )));
            }
        }
        Ok(Self {
            positions,
            offsets,
            values,
        })
    }

    /// Load `positions.<ext>` and `values.<ext>` from `dir`.
    pub fn from_text(dir: &Path, ext: &str) -> Result<Self> {
        let (positions_path, values_path) = text_paths(dir, ext);
        let mut positions = Vec::new();
        let mut offsets = Vec::new();
        let mut values = Vec::new();

        let mut last_major: Option<Arc<str>> = None;
        for_each_line(&positions_path, |line_no, line| {
            let fields = split_commas::<3>(line)
                .ok_or_else(|| bad_line(&positions_path, line_no, "expected 3 fields"))?;
            let major = std::str::from_utf8(fields[0])
                .map_err(|_| bad_line(&positions_path, line_no, "invalid chromosome"))?;
            let minor = parse_u64_fast(fields[1])
                .ok_or_else(|| bad_line(&positions_path, line_no, "invalid position"))?;
            let offset = parse_u64_fast(fields[2])
                .ok_or_else(|| bad_line(&positions_path, line_no, "invalid value offset"))?;

            let major = match last_major.as_ref() {
                Some(last) if last.as_ref() == major => Arc::clone(last),
                _ => Arc::from(major),
            };
            last_major = Some(Arc::clone(&major));
            positions.push(Position::new(major, minor));
            offsets.push(offset);
            Ok(())
        })?;

        for_each_line(&values_path, |line_no, line| {
            let fields = split_commas::<3>(line)
                .ok_or_else(|| bad_line(&values_path, line_no, "expected 3 fields"))?;
            let mut numbers = [0u64; 3];
            for (n, field) in numbers.iter_mut().zip(fields) {
                *n = parse_u64_fast(field)
                    .ok_or_else(|| bad_line(&values_path, line_no, "invalid number"))?;
            }
            let source_index = u32::try_from(numbers[0])
                .map_err(|_| bad_line(&values_path, line_no, "source index out of range"))?;
            values.push(Call::new(source_index, numbers[1], numbers[2]));
            Ok(())
        })?;

        Self::new(positions, offsets, values)
    }

    /// Load `positions.parquet` and `values.parquet` from `dir`.
    pub fn from_parquet(dir: &Path) -> Result<Self> {
        Self::from_tables(ColumnarTables::read_parquet(dir)?)
    }

    /// Build from in-memory columnar tables.
    pub fn from_tables(tables: ColumnarTables) -> Result<Self> {
        let positions = tables
            .position_major
            .into_iter()
            .zip(tables.position_minor)
            .map(|(major, minor)| Position::new(major, minor))
            .collect();
        let values = tables
            .source_index
            .iter()
            .zip(&tables.count_a)
            .zip(&tables.count_b)
            .map(|((&s, &a), &b)| Call::new(s, a, b))
            .collect();
        Self::new(positions, tables.value_offset, values)
    }

    /// Number of indexed positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Total number of value rows.
    pub fn value_rows(&self) -> usize {
        self.values.len()
    }

    /// Calls recorded at `position`, in source order.
    pub fn calls_at(&self, position: &Position) -> Option<&[Call]> {
        let i = self.positions.binary_search(position).ok()?;
        Some(self.block(i))
    }

    /// Iterate over `(position, calls)` in position order.
    pub fn iter(&self) -> impl Iterator<Item = (&Position, &[Call])> + '_ {
        self.positions
            .iter()
            .enumerate()
            .map(move |(i, p)| (p, self.block(i)))
    }

    fn block(&self, i: usize) -> &[Call] {
        let start = self.offsets[i] as usize;
        let end = self
            .offsets
            .get(i + 1)
            .map_or(self.values.len(), |&o| o as usize);
        &self.values[start..end]
    }
}

fn for_each_line<F>(path: &Path, mut f: F) -> Result<()>
where
    F: FnMut(u64, &[u8]) -> Result<()>,
{
    let file = File::open(path).map_err(|error| MergeError::SourceIo {
        input: path.display().to_string(),
        error,
    })?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::with_capacity(64);
    let mut line_no = 0u64;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        line_no += 1;
        let line = trim_line_end(&buf);
        if line.is_empty() {
            continue;
        }
        f(line_no, line)?;
    }
}

/// Split a line into exactly `N` comma-separated fields.
///
/// The chromosome is the only field that could contain a comma, so the
/// numeric fields are taken from the right.
fn split_commas<const N: usize>(line: &[u8]) -> Option<[&[u8]; N]> {
    let mut fields: [&[u8]; N] = [&[]; N];
    let mut rest = line;
    for slot in (1..N).rev() {
        let comma = memchr::memrchr(b',', rest)?;
        fields[slot] = &rest[comma + 1..];
        rest = &rest[..comma];
    }
    fields[0] = rest;
    Some(fields)
}

fn bad_line(path: &Path, line: u64, message: &str) -> MergeError {
    MergeError::Parse {
        input: path.display().to_string(),
        line,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergeDriver;
    use crate::sink::{write_merged, ColumnarSink, TextSink};
    use crate::streaming::source::MemorySource;

    fn scenario() -> Vec<MemorySource> {
        vec![
            MemorySource::new(0, vec![("chr1", 1, 1, 2), ("chr1", 5, 3, 4)]),
            MemorySource::new(1, vec![("chr1", 1, 5, 6), ("chr2", 1, 7, 8)]),
        ]
    }

    #[test]
    fn test_calls_at() {
        let mut sink = ColumnarSink::new();
        write_merged(MergeDriver::new(scenario()).unwrap(), &mut sink).unwrap();
        let index = PositionIndex::from_tables(sink.into_tables()).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.value_rows(), 4);
        assert_eq!(
            index.calls_at(&Position::new("chr1", 1)).unwrap(),
            &[Call::new(0, 1, 2), Call::new(1, 5, 6)]
        );
        assert_eq!(
            index.calls_at(&Position::new("chr2", 1)).unwrap(),
            &[Call::new(1, 7, 8)]
        );
        assert!(index.calls_at(&Position::new("chr1", 2)).is_none());
        assert!(index.calls_at(&Position::new("chr3", 1)).is_none());
    }

    #[test]
    fn test_text_and_columnar_agree() {
        let dir = tempfile::tempdir().unwrap();
        let mut text = TextSink::create(dir.path(), "txt").unwrap();
        write_merged(MergeDriver::new(scenario()).unwrap(), &mut text).unwrap();
        drop(text);

        let mut columnar = ColumnarSink::new();
        write_merged(MergeDriver::new(scenario()).unwrap(), &mut columnar).unwrap();

        let from_text = PositionIndex::from_text(dir.path(), "txt").unwrap();
        let from_tables = PositionIndex::from_tables(columnar.into_tables()).unwrap();
        assert_eq!(from_text, from_tables);
    }

    #[test]
    fn test_iter_blocks() {
        let mut sink = ColumnarSink::new();
        write_merged(MergeDriver::new(scenario()).unwrap(), &mut sink).unwrap();
        let index = PositionIndex::from_tables(sink.into_tables()).unwrap();
        let sizes: Vec<usize> = index.iter().map(|(_, calls)| calls.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1]);
    }

    #[test]
    fn test_rejects_bad_offsets() {
        let p = vec![Position::new("chr1", 1), Position::new("chr1", 2)];
        let v = vec![Call::new(0, 0, 0); 2];
        assert!(PositionIndex::new(p.clone(), vec![1, 2], v.clone()).is_err());
        assert!(PositionIndex::new(p.clone(), vec![0, 3], v.clone()).is_err());
        assert!(PositionIndex::new(p.clone(), vec![0], v.clone()).is_err());
        assert!(PositionIndex::new(p, vec![0, 1], v.clone()).is_ok());

        let unsorted = vec![Position::new("chr2", 1), Position::new("chr1", 2)];
        assert!(PositionIndex::new(unsorted, vec![0, 1], v).is_err());
    }

    #[test]
    fn test_split_commas() {
        assert_eq!(
            split_commas::<3>(b"chr1,5,2"),
            Some([&b"chr1"[..], &b"5"[..], &b"2"[..]])
        );
        assert_eq!(
            split_commas::<3>(b"HLA-A*01,01,5,2"),
            Some([&b"HLA-A*01,01"[..], &b"5"[..], &b"2"[..]])
        );
        assert_eq!(split_commas::<3>(b"chr1,5"), None);
    }

    #[test]
    fn test_from_text_reports_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("positions.txt"), "chr1,1,0\nchr1,x,1\n").unwrap();
        std::fs::write(dir.path().join("values.txt"), "0,1,1\n0,1,1\n").unwrap();
        let err = PositionIndex::from_text(dir.path(), "txt").unwrap_err();
        assert!(matches!(err, MergeError::Parse { line: 2, .. }));
    }
}
