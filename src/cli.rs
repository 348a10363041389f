use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    ConversionConfig, ConversionSummary, Destination,
    aggregate::DuplicatePolicy,
    convert_table_file,
    identifier::{DEFAULT_NESTED_MARKER, DEFAULT_SEPARATOR, IdentifierSplitter},
    input::InputFormat,
    report::RunReport,
    table::Columns,
};

const DEFAULT_OUTPUT_DIR: &str = "vcfs";

#[derive(Debug, Parser)]
#[command(author, version, about = "Convert tabular variant calls to per-patient VCF files", long_about = None)]
struct Cli {
    /// Input spreadsheet (.xlsx workbook, or a CSV/TSV export; optionally gzipped)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory receiving one <patient>.vcf per patient [default: vcfs]
    #[arg(value_name = "OUTPUT_DIR", conflicts_with = "stdout")]
    output_dir: Option<PathBuf>,

    /// Write all documents to stdout instead of a directory
    #[arg(long)]
    stdout: bool,

    /// Input file format
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    input_format: InputFormat,

    /// How to resolve a sample reporting the same variant twice
    #[arg(long, value_enum, default_value_t = DuplicatePolicy::KeepFirst)]
    on_duplicate: DuplicatePolicy,

    /// Identifiers starting with this marker keep only their last token as sample id
    #[arg(long, default_value = DEFAULT_NESTED_MARKER)]
    nested_prefix: String,

    /// Column holding the combined <patient>_<sample> identifier
    #[arg(long, default_value = "SampleID")]
    id_column: String,

    /// Chromosome column
    #[arg(long, default_value = "Chr")]
    chrom_column: String,

    /// Position column
    #[arg(long, default_value = "Position")]
    pos_column: String,

    /// Reference allele column
    #[arg(long, default_value = "Ref")]
    ref_column: String,

    /// Alternate allele column
    #[arg(long, default_value = "Alt")]
    alt_column: String,

    /// Alternate read count column
    #[arg(long, default_value = "AltCount")]
    alt_count_column: String,

    /// Second read count column; added to the alt count to form DP
    #[arg(long, default_value = "RefCount")]
    ref_count_column: String,

    /// Write a JSON run report to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn into_config(self) -> (ConversionConfig, Option<PathBuf>) {
        let destination = if self.stdout {
            Destination::Stdout
        } else {
            Destination::Directory(
                self.output_dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            )
        };

        let config = ConversionConfig {
            input: self.input,
            input_format: self.input_format,
            columns: Columns {
                identifier: self.id_column,
                chrom: self.chrom_column,
                position: self.pos_column,
                reference: self.ref_column,
                alternate: self.alt_column,
                alt_count: self.alt_count_column,
                other_count: self.ref_count_column,
            },
            splitter: IdentifierSplitter::new(DEFAULT_SEPARATOR, self.nested_prefix),
            duplicate_policy: self.on_duplicate,
            destination,
        };
        (config, self.report)
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let (config, report_path) = cli.into_config();
    let summary = convert_table_file(&config)?;

    if let Some(path) = &report_path {
        RunReport::new(&config, &summary)
            .write(path)
            .with_context(|| format!("failed to write run report {}", path.display()))?;
    }

    // Documents own stdout in streaming mode
    let to_stderr = config.destination == Destination::Stdout;
    for line in summary_lines(&summary) {
        if to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    if summary.has_failures() {
        anyhow::bail!(
            "{} of {} patients failed",
            summary.failures.len(),
            summary.patients
        );
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn summary_lines(summary: &ConversionSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Processed {rows} rows for {patients} patients; wrote {written} ({variants} variant lines).",
        rows = summary.total_rows,
        patients = summary.patients,
        written = summary.written_patients,
        variants = summary.variant_records,
    )];

    if summary.duplicate_evidence > 0 {
        lines.push(format!(
            "Resolved {count} duplicate sample contributions.",
            count = summary.duplicate_evidence
        ));
    }

    for failure in &summary.failures {
        lines.push(format!(
            "Skipped patient {patient}: {error}",
            patient = failure.patient,
            error = failure.error
        ));
    }
    lines
}
