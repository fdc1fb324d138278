//! Look up the calls stored at one position of a merged output.

use crate::config::OutputFormat;
use crate::error::Result;
use crate::index::PositionIndex;
use crate::position::Position;
use std::io::Write;
use std::path::Path;

/// Lookup command configuration.
#[derive(Debug, Clone, Default)]
pub struct LookupCommand {
    /// Layout of the merged output to read
    pub output: OutputFormat,
}

impl LookupCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output layout (builder pattern).
    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    /// Load the position index of the merge in `dir`.
    pub fn load(&self, dir: &Path) -> Result<PositionIndex> {
        match &self.output {
            OutputFormat::Text { ext } => PositionIndex::from_text(dir, ext),
            OutputFormat::Parquet => PositionIndex::from_parquet(dir),
        }
    }

    /// Write `source_index\tcount_a\tcount_b` for every call at `position`.
    ///
    /// Returns the number of calls written; zero if the position is absent.
    pub fn run<W: Write>(&self, dir: &Path, position: &Position, output: &mut W) -> Result<usize> {
        let index = self.load(dir)?;
        let calls = index.calls_at(position).unwrap_or(&[]);
        for call in calls {
            writeln!(
                output,
                "{}\t{}\t{}",
                call.source_index, call.count_a, call.count_b
            )?;
        }
        Ok(calls.len())
    }
}
