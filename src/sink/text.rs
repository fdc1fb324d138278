//! Line-oriented text output.
//!
//! Two logs are written side by side:
//! - `positions.<ext>`: `chrom,pos,value_offset`
//! - `values.<ext>`: `source_index,count_a,count_b`
//!
//! The value rows of line `i` in the position log start at line
//! `value_offset` (0-based) of the value log.

use crate::error::Result;
use crate::position::{Call, Position};
use crate::sink::OutputSink;
use crate::streaming::output::LogWriter;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Paths of the position and value logs for `dir` and `ext`.
pub fn text_paths(dir: &Path, ext: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("positions.{}", ext)),
        dir.join(format!("values.{}", ext)),
    )
}

/// Writes the position log and value log.
pub struct TextSink<W: Write> {
    positions: LogWriter<W>,
    values: LogWriter<W>,
}

impl TextSink<File> {
    /// Create `positions.<ext>` and `values.<ext>` in `dir`, truncating
    /// existing files.
    pub fn create(dir: &Path, ext: &str) -> Result<Self> {
        let (positions, values) = text_paths(dir, ext);
        Ok(Self::new(File::create(positions)?, File::create(values)?))
    }
}

impl<W: Write> TextSink<W> {
    pub fn new(positions: W, values: W) -> Self {
        Self {
            positions: LogWriter::new(positions),
            values: LogWriter::new(values),
        }
    }

    /// Flush both logs and return the underlying writers.
    pub fn into_inner(self) -> Result<(W, W)> {
        Ok((self.positions.into_inner()?, self.values.into_inner()?))
    }
}

impl<W: Write> OutputSink for TextSink<W> {
    fn write_index_entry(&mut self, position: &Position, value_offset: u64) -> Result<()> {
        self.positions.write_bytes(position.major().as_bytes())?;
        self.positions.write_comma()?;
        self.positions.write_int(position.minor())?;
        self.positions.write_comma()?;
        self.positions.write_int(value_offset)?;
        self.positions.write_newline()
    }

    fn write_value_row(&mut self, call: &Call) -> Result<()> {
        self.values
            .write_int_triple(call.source_index, call.count_a, call.count_b)
    }

    fn finish(&mut self) -> Result<()> {
        self.positions.flush()?;
        self.values.flush()
    }
}
