//! Streaming reader for per-sample methylation call files.
//!
//! A call file is tab-separated with one line per covered position, sorted
//! by (chromosome, position). By default the first line is a header naming
//! the columns (`chr`, `pos`, `nonmet_reads`, `met_reads`), and any other
//! columns are ignored. Files may be gzip compressed.

use crate::config::InputFormat;
use crate::error::{MergeError, Result};
use crate::position::{Call, Position};
use crate::streaming::buffers::{DEFAULT_INPUT_BUFFER, DEFAULT_LINE_BUFFER};
use crate::streaming::parsing::{
    parse_u64_fast, should_skip_line, split_tab_fields, trim_line_end,
};
use crate::streaming::source::CallSource;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const FIELD_NAMES: [&str; 4] = ["chromosome", "position", "first count", "second count"];

/// Open a call file for reading, decompressing gzip input transparently.
///
/// `-` reads from stdin. Compression is detected from the magic bytes, not
/// the file name, and multi-member (bgzip) files are read to the end.
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::with_capacity(
            DEFAULT_INPUT_BUFFER,
            io::stdin(),
        )));
    }

    let source_io = |error| MergeError::SourceIo {
        input: path.display().to_string(),
        error,
    };
    let file = File::open(path).map_err(source_io)?;
    let mut reader = BufReader::with_capacity(DEFAULT_INPUT_BUFFER, file);
    let is_gzip = reader.fill_buf().map_err(source_io)?.starts_with(&GZIP_MAGIC);

    if is_gzip {
        Ok(Box::new(BufReader::with_capacity(
            DEFAULT_INPUT_BUFFER,
            MultiGzDecoder::new(reader),
        )))
    } else {
        Ok(Box::new(reader))
    }
}

/// A streaming call reader for one source.
pub struct CallReader<R> {
    reader: R,
    source_index: u32,
    name: String,
    format: InputFormat,
    /// Column indices of chrom, pos, count_a, count_b once known.
    columns: Option<[usize; 4]>,
    line_number: u64,
    buffer: Vec<u8>,
    bounds: Vec<(usize, usize)>,
    last_major: Option<Arc<str>>,
}

impl CallReader<Box<dyn BufRead + Send>> {
    /// Open a call file from a path, named after the path in errors.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        source_index: u32,
        format: InputFormat,
    ) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_input(path)?;
        Ok(Self::new(reader, source_index, format).with_name(path.display().to_string()))
    }
}

impl<R: BufRead> CallReader<R> {
    /// Create a new call reader from any buffered source.
    pub fn new(reader: R, source_index: u32, format: InputFormat) -> Self {
        let columns = if format.header {
            None
        } else {
            Some([0, 1, 2, 3])
        };
        Self {
            reader,
            source_index,
            name: format!("source {}", source_index),
            format,
            columns,
            line_number: 0,
            buffer: Vec::with_capacity(DEFAULT_LINE_BUFFER),
            bounds: Vec::with_capacity(8),
            last_major: None,
        }
    }

    /// Set the name used in error messages (builder pattern).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index stamped on every call from this reader.
    pub fn source_index(&self) -> u32 {
        self.source_index
    }

    /// Number of lines consumed so far, including header and comments.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Read the next call.
    pub fn read_call(&mut self) -> Result<Option<(Position, Call)>> {
        loop {
            self.buffer.clear();
            let bytes_read = self
                .reader
                .read_until(b'\n', &mut self.buffer)
                .map_err(|error| MergeError::SourceIo {
                    input: self.name.clone(),
                    error,
                })?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = trim_line_end(&self.buffer);
            if should_skip_line(line) {
                continue;
            }

            match self.columns {
                Some(columns) => return self.parse_record(columns).map(Some),
                None => {
                    let columns = self.resolve_header(line)?;
                    self.columns = Some(columns);
                }
            }
        }
    }

    /// Map the configured column names to indices in a header line.
    fn resolve_header(&self, line: &[u8]) -> Result<[usize; 4]> {
        let header: Vec<&[u8]> = line.split(|&b| b == b'\t').collect();
        let names = &self.format.columns;
        let wanted = [&names.major, &names.minor, &names.count_a, &names.count_b];

        let mut columns = [0usize; 4];
        let mut missing = Vec::new();
        for (slot, name) in columns.iter_mut().zip(wanted) {
            match header.iter().position(|h| *h == name.as_bytes()) {
                Some(idx) => *slot = idx,
                None => missing.push(name.as_str()),
            }
        }

        if !missing.is_empty() {
            return Err(MergeError::InvalidFormat(format!(
                "{}: header is missing column(s) {}",
                self.name,
                missing.join(", ")
            )));
        }
        Ok(columns)
    }

    fn parse_record(&mut self, columns: [usize; 4]) -> Result<(Position, Call)> {
        let line = trim_line_end(&self.buffer);
        split_tab_fields(line, &mut self.bounds);

        let name = &self.name;
        let line_number = self.line_number;
        let bounds = &self.bounds;
        let field = |i: usize| -> Result<&[u8]> {
            bounds
                .get(columns[i])
                .map(|&(start, end)| &line[start..end])
                .ok_or_else(|| {
                    parse_error(
                        name,
                        line_number,
                        format!(
                            "missing {} column (expected at least {} fields, got {})",
                            FIELD_NAMES[i],
                            columns[i] + 1,
                            bounds.len()
                        ),
                    )
                })
        };
        let number = |i: usize| -> Result<u64> {
            let raw = field(i)?;
            parse_u64_fast(raw).ok_or_else(|| {
                parse_error(
                    name,
                    line_number,
                    format!(
                        "invalid {} '{}'",
                        FIELD_NAMES[i],
                        String::from_utf8_lossy(raw)
                    ),
                )
            })
        };

        let major_bytes = field(0)?;
        if major_bytes.is_empty() {
            return Err(parse_error(name, line_number, "empty chromosome".into()));
        }
        let major = std::str::from_utf8(major_bytes).map_err(|_| {
            parse_error(name, line_number, "chromosome is not valid UTF-8".into())
        })?;
        let minor = number(1)?;
        let count_a = number(2)?;
        let count_b = number(3)?;

        let major = match self.last_major.as_ref() {
            Some(last) if last.as_ref() == major => Arc::clone(last),
            _ => Arc::from(major),
        };
        self.last_major = Some(Arc::clone(&major));

        Ok((
            Position::new(major, minor),
            Call::new(self.source_index, count_a, count_b),
        ))
    }
}

impl<R: BufRead> CallSource for CallReader<R> {
    fn next_call(&mut self) -> Result<Option<(Position, Call)>> {
        self.read_call()
    }

    fn describe(&self) -> String {
        self.name.clone()
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }
}

fn parse_error(name: &str, line: u64, message: String) -> MergeError {
    MergeError::Parse {
        input: name.to_string(),
        line,
        message,
    }
}
