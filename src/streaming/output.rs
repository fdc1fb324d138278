//! Efficient line output for the text logs.
//!
//! Uses itoa for integer formatting to avoid allocation in the hot path.

use crate::error::Result;
use crate::streaming::buffers::DEFAULT_OUTPUT_BUFFER;
use std::io::{BufWriter, Write};

/// Buffered writer for comma-separated log lines.
pub struct LogWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> LogWriter<W> {
    /// Create a new LogWriter with the default 2MB buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output)
    }

    /// Create a new LogWriter with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Write raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Write an integer using itoa.
    #[inline]
    pub fn write_int<I: itoa::Integer>(&mut self, n: I) -> Result<()> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    /// Write a field separator.
    #[inline]
    pub fn write_comma(&mut self) -> Result<()> {
        self.writer.write_all(b",")?;
        Ok(())
    }

    /// Write a newline character.
    #[inline]
    pub fn write_newline(&mut self) -> Result<()> {
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write `a,b,c\n` for three integers.
    #[inline]
    pub fn write_int_triple<A, B, C>(&mut self, a: A, b: B, c: C) -> Result<()>
    where
        A: itoa::Integer,
        B: itoa::Integer,
        C: itoa::Integer,
    {
        self.write_int(a)?;
        self.write_comma()?;
        self.write_int(b)?;
        self.write_comma()?;
        self.write_int(c)?;
        self.write_newline()
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}
