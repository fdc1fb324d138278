//! Columnar output backed by growable column arrays.
//!
//! The same two record families as the text logs, held column by column:
//! - positions: `major`, `minor`, `value_offset`
//! - values: `source_index`, `count_a`, `count_b`
//!
//! Columns grow by amortized doubling, so there is no capacity limit. When
//! an output directory is set, [`OutputSink::finish`] persists the columns
//! as `positions.parquet` and `values.parquet`.

use crate::error::{MergeError, Result};
use crate::position::{Call, Position};
use crate::sink::OutputSink;
use arrow::array::{Array, ArrayRef, StringArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the positions table.
pub const POSITIONS_TABLE: &str = "positions.parquet";
/// File name of the values table.
pub const VALUES_TABLE: &str = "values.parquet";

/// Parallel columns of a merged output.
///
/// Row `i` of the position columns owns value rows
/// `value_offset[i]..value_offset[i + 1]` (or to the end for the last row).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnarTables {
    pub position_major: Vec<Arc<str>>,
    pub position_minor: Vec<u64>,
    pub value_offset: Vec<u64>,
    pub source_index: Vec<u32>,
    pub count_a: Vec<u64>,
    pub count_b: Vec<u64>,
}

impl ColumnarTables {
    /// Empty tables with room for the given number of rows.
    pub fn with_capacity(positions: usize, values: usize) -> Self {
        Self {
            position_major: Vec::with_capacity(positions),
            position_minor: Vec::with_capacity(positions),
            value_offset: Vec::with_capacity(positions),
            source_index: Vec::with_capacity(values),
            count_a: Vec::with_capacity(values),
            count_b: Vec::with_capacity(values),
        }
    }

    /// Number of position rows.
    pub fn positions(&self) -> usize {
        self.position_minor.len()
    }

    /// Number of value rows.
    pub fn values(&self) -> usize {
        self.source_index.len()
    }

    pub fn positions_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("major", DataType::Utf8, false),
            Field::new("minor", DataType::UInt64, false),
            Field::new("value_offset", DataType::UInt64, false),
        ]))
    }

    pub fn values_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("source_index", DataType::UInt32, false),
            Field::new("count_a", DataType::UInt64, false),
            Field::new("count_b", DataType::UInt64, false),
        ]))
    }

    /// Position columns as an Arrow record batch.
    pub fn positions_batch(&self) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                self.position_major.iter().map(|m| m.as_ref()),
            )),
            Arc::new(UInt64Array::from_iter_values(
                self.position_minor.iter().copied(),
            )),
            Arc::new(UInt64Array::from_iter_values(
                self.value_offset.iter().copied(),
            )),
        ];
        Ok(RecordBatch::try_new(Self::positions_schema(), columns)?)
    }

    /// Value columns as an Arrow record batch.
    pub fn values_batch(&self) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(UInt32Array::from_iter_values(
                self.source_index.iter().copied(),
            )),
            Arc::new(UInt64Array::from_iter_values(self.count_a.iter().copied())),
            Arc::new(UInt64Array::from_iter_values(self.count_b.iter().copied())),
        ];
        Ok(RecordBatch::try_new(Self::values_schema(), columns)?)
    }

    /// Write both tables as Parquet files into `dir`.
    pub fn write_parquet(&self, dir: &Path) -> Result<()> {
        write_batch(&dir.join(POSITIONS_TABLE), self.positions_batch()?)?;
        write_batch(&dir.join(VALUES_TABLE), self.values_batch()?)?;
        info!(
            "Wrote {} positions and {} values to {}",
            self.positions(),
            self.values(),
            dir.display()
        );
        Ok(())
    }

    /// Load tables written by [`write_parquet`](Self::write_parquet).
    pub fn read_parquet(dir: &Path) -> Result<Self> {
        let mut tables = ColumnarTables::default();

        for batch in read_batches(&dir.join(POSITIONS_TABLE))? {
            let major = column::<StringArray>(&batch, "major")?;
            let minor = column::<UInt64Array>(&batch, "minor")?;
            let offset = column::<UInt64Array>(&batch, "value_offset")?;
            for i in 0..major.len() {
                let label = major.value(i);
                let shared = match tables.position_major.last() {
                    Some(last) if last.as_ref() == label => Arc::clone(last),
                    _ => Arc::from(label),
                };
                tables.position_major.push(shared);
            }
            tables.position_minor.extend_from_slice(minor.values());
            tables.value_offset.extend_from_slice(offset.values());
        }

        for batch in read_batches(&dir.join(VALUES_TABLE))? {
            let source_index = column::<UInt32Array>(&batch, "source_index")?;
            let count_a = column::<UInt64Array>(&batch, "count_a")?;
            let count_b = column::<UInt64Array>(&batch, "count_b")?;
            tables.source_index.extend_from_slice(source_index.values());
            tables.count_a.extend_from_slice(count_a.values());
            tables.count_b.extend_from_slice(count_b.values());
        }

        Ok(tables)
    }
}

fn write_batch(path: &Path, batch: RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    if batch.num_rows() > 0 {
        writer.write(&batch)?;
    }
    writer.close()?;
    Ok(())
}

fn read_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path).map_err(|error| MergeError::SourceIo {
        input: path.display().to_string(),
        error,
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(batches)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| {
            MergeError::InvalidFormat(format!("missing or mistyped column '{}'", name))
        })
}

/// Collects merged output into [`ColumnarTables`].
#[derive(Debug, Default)]
pub struct ColumnarSink {
    tables: ColumnarTables,
    output_dir: Option<PathBuf>,
}

impl ColumnarSink {
    /// In-memory sink; nothing is persisted on finish.
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory sink with pre-sized columns. The sizes are hints only.
    pub fn with_capacity(positions: usize, values: usize) -> Self {
        Self {
            tables: ColumnarTables::with_capacity(positions, values),
            output_dir: None,
        }
    }

    /// Persist the tables as Parquet into `dir` on finish (builder pattern).
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn tables(&self) -> &ColumnarTables {
        &self.tables
    }

    pub fn into_tables(self) -> ColumnarTables {
        self.tables
    }
}

impl OutputSink for ColumnarSink {
    fn write_index_entry(&mut self, position: &Position, value_offset: u64) -> Result<()> {
        let major = match self.tables.position_major.last() {
            Some(last) if last.as_ref() == position.major() => Arc::clone(last),
            _ => Arc::clone(position.major_arc()),
        };
        self.tables.position_major.push(major);
        self.tables.position_minor.push(position.minor());
        self.tables.value_offset.push(value_offset);
        Ok(())
    }

    fn write_value_row(&mut self, call: &Call) -> Result<()> {
        self.tables.source_index.push(call.source_index);
        self.tables.count_a.push(call.count_a);
        self.tables.count_b.push(call.count_b);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(dir) = &self.output_dir {
            self.tables.write_parquet(dir)?;
        }
        Ok(())
    }
}
