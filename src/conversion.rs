use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;

use crate::{
    aggregate::{AggregateError, DuplicatePolicy, aggregate},
    identifier::{IdentifierError, IdentifierSplitter},
    input::InputFormat,
    output::{DirectorySink, OutputError, PatientSink, WriterSink},
    sheet::SheetReader,
    smart_reader,
    table::{self, Columns, ParseError, Row},
    vcf,
};

/// Where finished documents go.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Destination {
    /// One `<patient>.vcf` per patient in this directory.
    Directory(PathBuf),
    /// All documents concatenated on stdout.
    Stdout,
}

/// Configuration required to drive a conversion.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub input: PathBuf,
    pub input_format: InputFormat,
    pub columns: Columns,
    pub splitter: IdentifierSplitter,
    pub duplicate_policy: DuplicatePolicy,
    pub destination: Destination,
}

/// A patient that was skipped, with the reason.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct PatientFailure {
    pub patient: String,
    pub error: String,
}

/// Counters collected over one run.
#[derive(Debug, Clone, Default)]
pub struct ConversionSummary {
    pub input_format: Option<InputFormat>,
    pub total_rows: usize,
    pub patients: usize,
    pub written_patients: usize,
    pub variant_records: usize,
    pub samples: usize,
    pub duplicate_evidence: usize,
    pub failures: Vec<PatientFailure>,
}

impl ConversionSummary {
    pub fn record_patient(&mut self, rendered: &RenderedPatient) {
        self.written_patients += 1;
        self.variant_records += rendered.variants;
        self.samples += rendered.samples;
        self.duplicate_evidence += rendered.duplicates;
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Errors that abort a whole run rather than a single patient.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    #[error("row cannot be attributed to a patient: {0}")]
    Unattributable(#[source] ParseError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// A patient's rows in input order; malformed rows are kept so the patient can fail on them.
pub type PatientRows = Vec<Result<Row, ParseError>>;

/// Partition rows by patient id. Patients come out in ascending id order.
pub fn group_rows<I>(
    rows: I,
    splitter: &IdentifierSplitter,
) -> Result<BTreeMap<String, PatientRows>, ConversionError>
where
    I: IntoIterator<Item = Result<Row, ParseError>>,
{
    let mut groups: BTreeMap<String, PatientRows> = BTreeMap::new();
    for row in rows {
        let patient = raw_identifier(&row)
            .map(|raw| splitter.patient_id(raw))
            .transpose()?;
        match (patient, row) {
            (Some(patient), row) => groups.entry(patient).or_default().push(row),
            (None, Err(e)) => return Err(ConversionError::Unattributable(e)),
            // a parsed row always carries its identifier
            (None, Ok(_)) => {}
        }
    }
    Ok(groups)
}

fn raw_identifier(row: &Result<Row, ParseError>) -> Option<&str> {
    match row {
        Ok(row) => Some(&row.raw_identifier),
        Err(e) => e.identifier.as_deref(),
    }
}

/// One patient's rendered document and its counts.
#[derive(Debug, Clone)]
pub struct RenderedPatient {
    pub document: String,
    pub variants: usize,
    pub samples: usize,
    pub duplicates: usize,
}

/// Aggregate and render one patient's rows.
pub fn process_patient(
    patient: &str,
    rows: PatientRows,
    splitter: &IdentifierSplitter,
    policy: DuplicatePolicy,
) -> Result<RenderedPatient, AggregateError> {
    let aggregated = aggregate(rows, splitter, policy)?;
    let document = vcf::serialize(patient, &aggregated.variants, &aggregated.samples);
    Ok(RenderedPatient {
        document,
        variants: aggregated.variants.len(),
        samples: aggregated.samples.len(),
        duplicates: aggregated.duplicates.len(),
    })
}

/// Group `rows`, render every patient and hand the documents to `sink`.
///
/// A patient with a malformed row, a rejected duplicate or an id unusable
/// as a file name is recorded as a failure and skipped; the rest continue.
pub fn convert_rows<I, S>(
    rows: I,
    splitter: &IdentifierSplitter,
    policy: DuplicatePolicy,
    sink: &mut S,
) -> Result<ConversionSummary, ConversionError>
where
    I: IntoIterator<Item = Result<Row, ParseError>>,
    S: PatientSink + ?Sized,
{
    let groups = group_rows(rows, splitter)?;
    let mut summary = ConversionSummary::default();

    for (patient, rows) in groups {
        summary.total_rows += rows.len();
        summary.patients += 1;

        let rendered = match process_patient(&patient, rows, splitter, policy) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(patient = %patient, error = %e, "skipping patient");
                summary.failures.push(PatientFailure {
                    patient,
                    error: e.to_string(),
                });
                continue;
            }
        };

        match sink.accept(&patient, &rendered.document) {
            Ok(()) => summary.record_patient(&rendered),
            Err(e @ OutputError::UnsafeFileName(_)) => {
                tracing::warn!(patient = %patient, error = %e, "skipping patient");
                summary.failures.push(PatientFailure {
                    patient,
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}

/// Convert the tabular export at `config.input` into per-patient VCF documents.
pub fn convert_table_file(config: &ConversionConfig) -> Result<ConversionSummary> {
    tracing::info!(
        input = %config.input.display(),
        input_format = ?config.input_format,
        destination = ?config.destination,
        duplicate_policy = ?config.duplicate_policy,
        "starting conversion",
    );

    let mut reader = smart_reader::open_input(&config.input)
        .with_context(|| format!("failed to open input {}", config.input.display()))?;
    let input_format = config
        .input_format
        .resolve(&config.input, &mut reader)
        .with_context(|| format!("failed to read input {}", config.input.display()))?;
    tracing::debug!(format = input_format.name(), "resolved input format");

    let rows: Box<dyn Iterator<Item = Result<Row, ParseError>>> = match input_format {
        InputFormat::Xlsx => Box::new(
            SheetReader::new(reader, config.columns.clone()).with_context(|| {
                format!("failed to read worksheet header of {}", config.input.display())
            })?,
        ),
        _ => Box::new(
            table::Reader::new(reader, input_format.delimiter(), config.columns.clone())
                .with_context(|| format!("failed to read header of {}", config.input.display()))?,
        ),
    };

    let mut sink: Box<dyn PatientSink> = match &config.destination {
        Destination::Directory(dir) => Box::new(
            DirectorySink::create(dir)
                .with_context(|| format!("failed to create output directory {}", dir.display()))?,
        ),
        Destination::Stdout => Box::new(WriterSink::stdout()),
    };

    let mut summary = convert_rows(rows, &config.splitter, config.duplicate_policy, &mut sink)
        .context("conversion aborted")?;
    summary.input_format = Some(input_format);

    tracing::info!(
        patients = summary.patients,
        written = summary.written_patients,
        failed = summary.failures.len(),
        "finished conversion",
    );
    Ok(summary)
}
