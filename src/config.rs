//! Run configuration for methmerge.
//!
//! Everything here is passed explicitly into readers, drivers and commands.
//! There is no process-wide state: two merges with different settings can
//! run side by side in the same process.

/// Column names looked up in a header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    /// Chromosome column.
    pub major: String,
    /// Position column.
    pub minor: String,
    /// First count column.
    pub count_a: String,
    /// Second count column.
    pub count_b: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            major: "chr".to_string(),
            minor: "pos".to_string(),
            count_a: "nonmet_reads".to_string(),
            count_b: "met_reads".to_string(),
        }
    }
}

/// Layout of a call file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFormat {
    /// First non-comment line names the columns.
    pub header: bool,
    /// Names resolved against the header; ignored without a header.
    pub columns: ColumnNames,
}

impl Default for InputFormat {
    fn default() -> Self {
        Self {
            header: true,
            columns: ColumnNames::default(),
        }
    }
}

impl InputFormat {
    /// Headerless input: columns 0..4 are chrom, pos, count_a, count_b.
    pub fn headerless() -> Self {
        Self {
            header: false,
            columns: ColumnNames::default(),
        }
    }

    /// Set header flag (builder pattern).
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Set column names (builder pattern).
    pub fn with_columns(mut self, columns: ColumnNames) -> Self {
        self.columns = columns;
        self
    }
}

/// How the merge selects the minimum head among the sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Scan every head each step. Cheapest for a few dozen sources.
    Linear,
    /// Binary heap of heads, O(log k) per call.
    Heap,
    /// Linear up to [`AUTO_HEAP_THRESHOLD`] sources, heap above.
    #[default]
    Auto,
}

/// Source count above which [`MergeStrategy::Auto`] switches to the heap.
pub const AUTO_HEAP_THRESHOLD: usize = 32;

impl MergeStrategy {
    /// Resolve `Auto` for a given number of sources.
    #[inline]
    pub fn resolve(self, n_sources: usize) -> MergeStrategy {
        match self {
            MergeStrategy::Auto if n_sources > AUTO_HEAP_THRESHOLD => MergeStrategy::Heap,
            MergeStrategy::Auto => MergeStrategy::Linear,
            other => other,
        }
    }
}

/// Output layout written by a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// `positions.<ext>` and `values.<ext>` comma-separated logs.
    Text { ext: String },
    /// `positions.parquet` and `values.parquet` tables.
    Parquet,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Text {
            ext: "txt".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_input_format() {
        let format = InputFormat::default();
        assert!(format.header);
        assert_eq!(format.columns.major, "chr");
        assert_eq!(format.columns.count_a, "nonmet_reads");
        assert_eq!(format.columns.count_b, "met_reads");
        assert!(!InputFormat::headerless().header);
    }

    #[test]
    fn test_strategy_resolve() {
        assert_eq!(MergeStrategy::Auto.resolve(2), MergeStrategy::Linear);
        assert_eq!(
            MergeStrategy::Auto.resolve(AUTO_HEAP_THRESHOLD),
            MergeStrategy::Linear
        );
        assert_eq!(
            MergeStrategy::Auto.resolve(AUTO_HEAP_THRESHOLD + 1),
            MergeStrategy::Heap
        );
        assert_eq!(MergeStrategy::Heap.resolve(1), MergeStrategy::Heap);
        assert_eq!(MergeStrategy::Linear.resolve(1000), MergeStrategy::Linear);
    }
}
