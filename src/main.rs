//! methmerge: merge per-sample methylation calls into a position index
//!
//! Usage: methmerge <COMMAND> [OPTIONS]

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{info, warn};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use methmerge::commands::{collect_inputs, LookupCommand, MergeCallsCommand, DEFAULT_INPUT_SUFFIX};
use methmerge::config::{ColumnNames, InputFormat, MergeStrategy, OutputFormat};
use methmerge::streaming::verify_sorted;
use methmerge::{CallReader, MergeError, Position};

#[derive(Parser)]
#[command(name = "methmerge")]
#[command(version)]
#[command(about = "Merge sorted per-sample methylation calls into a position-indexed store", long_about = None)]
struct Cli {
    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    /// positions.<ext> and values.<ext> comma-separated logs
    Text,
    /// positions.parquet and values.parquet tables
    Parquet,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Linear,
    Heap,
    Auto,
}

impl From<StrategyArg> for MergeStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Linear => MergeStrategy::Linear,
            StrategyArg::Heap => MergeStrategy::Heap,
            StrategyArg::Auto => MergeStrategy::Auto,
        }
    }
}

fn output_format(format: FormatArg, ext: String) -> OutputFormat {
    match format {
        FormatArg::Text => OutputFormat::Text { ext },
        FormatArg::Parquet => OutputFormat::Parquet,
    }
}

/// Layout of the input call files, shared by `merge` and `check`.
#[derive(Args)]
struct LayoutArgs {
    /// Inputs have no header line (columns: chrom, pos, count_a, count_b)
    #[arg(long)]
    no_header: bool,

    /// Header name of the chromosome column
    #[arg(long, default_value = "chr")]
    major_column: String,

    /// Header name of the position column
    #[arg(long, default_value = "pos")]
    minor_column: String,

    /// Header name of the first count column (unmethylated reads)
    #[arg(long, default_value = "nonmet_reads")]
    count_a_column: String,

    /// Header name of the second count column (methylated reads)
    #[arg(long, default_value = "met_reads")]
    count_b_column: String,
}

impl From<LayoutArgs> for InputFormat {
    fn from(args: LayoutArgs) -> Self {
        InputFormat::default()
            .with_header(!args.no_header)
            .with_columns(ColumnNames {
                major: args.major_column,
                minor: args.minor_column,
                count_a: args.count_a_column,
                count_b: args.count_b_column,
            })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Merge sorted call files into one position index
    Merge {
        /// Input call files (source index = order given)
        inputs: Vec<PathBuf>,

        /// Merge every file in this directory ending with --suffix
        #[arg(short = 'd', long)]
        input_dir: Option<PathBuf>,

        /// File name suffix used with --input-dir
        #[arg(long, default_value = DEFAULT_INPUT_SUFFIX)]
        suffix: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Output layout
        #[arg(short, long, value_enum, default_value = "text")]
        format: FormatArg,

        /// Extension of the text logs
        #[arg(long, default_value = "txt")]
        ext: String,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Head selection strategy
        #[arg(long, value_enum, default_value = "auto")]
        strategy: StrategyArg,

        /// Fail if any input is not strictly sorted
        #[arg(long)]
        check_order: bool,

        /// Decode each input on its own thread
        #[arg(long)]
        read_ahead: bool,

        /// Print merge statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Verify that call files are strictly sorted by (chrom, pos)
    Check {
        /// Input call files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Print the calls stored at one position
    Lookup {
        /// Directory holding a merged output
        #[arg(short = 'd', long)]
        dir: PathBuf,

        /// Layout of the merged output
        #[arg(short, long, value_enum, default_value = "text")]
        format: FormatArg,

        /// Extension of the text logs
        #[arg(long, default_value = "txt")]
        ext: String,

        /// Chromosome
        chrom: String,

        /// Position
        pos: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Merge {
            inputs,
            input_dir,
            suffix,
            output_dir,
            format,
            ext,
            layout,
            strategy,
            check_order,
            read_ahead,
            stats,
        } => {
            let cmd = MergeCallsCommand::new()
                .with_format(layout.into())
                .with_strategy(strategy.into())
                .with_check_order(check_order)
                .with_read_ahead(read_ahead)
                .with_output(output_format(format, ext));
            run_merge(cmd, inputs, input_dir, &suffix, &output_dir, stats)
        }
        Commands::Check { inputs, layout } => run_check(&inputs, layout.into()),
        Commands::Lookup {
            dir,
            format,
            ext,
            chrom,
            pos,
        } => run_lookup(&dir, output_format(format, ext), chrom, pos),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_merge(
    cmd: MergeCallsCommand,
    mut inputs: Vec<PathBuf>,
    input_dir: Option<PathBuf>,
    suffix: &str,
    output_dir: &Path,
    stats: bool,
) -> Result<(), MergeError> {
    if let Some(dir) = input_dir {
        let found = collect_inputs(&dir, suffix)?;
        info!(
            "Found {} '*{}' files in {}",
            found.len(),
            suffix,
            dir.display()
        );
        inputs.extend(found);
    }
    if inputs.is_empty() {
        warn!("No inputs given; writing an empty merge");
    }

    let result = cmd.run(&inputs, output_dir)?;
    if stats {
        eprintln!("Merge stats: {}", result);
    }
    Ok(())
}

fn run_check(inputs: &[PathBuf], format: InputFormat) -> Result<(), MergeError> {
    for (source_index, path) in (0u32..).zip(inputs) {
        let mut reader = CallReader::from_path(path, source_index, format.clone())?;
        let records = verify_sorted(&mut reader)?;
        info!("{}: {} records, sorted", path.display(), records);
    }
    Ok(())
}

fn run_lookup(dir: &Path, format: OutputFormat, chrom: String, pos: u64) -> Result<(), MergeError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let cmd = LookupCommand::new().with_output(format);
    cmd.run(dir, &Position::new(chrom, pos), &mut handle)?;
    handle.flush()?;
    Ok(())
}
