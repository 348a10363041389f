//! Structured run report for downstream tool consumption.
//!
//! Written as JSON when requested, containing the run configuration and
//! the conversion statistics including every skipped patient.

use serde::Serialize;
use std::path::Path;

use crate::aggregate::DuplicatePolicy;
use crate::conversion::{ConversionConfig, Destination};
use crate::input::InputFormat;
use crate::{ConversionSummary, PatientFailure};

/// Complete report of a conversion run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Tool version
    pub version: String,
    /// Timestamp of run (RFC 3339)
    pub timestamp: String,

    pub input: InputInfo,
    pub output: OutputInfo,
    pub duplicate_policy: DuplicatePolicy,

    /// Conversion statistics
    pub statistics: Statistics,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<PatientFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    pub path: String,
    pub format: InputFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputInfo {
    /// `stdout` or the output directory
    pub destination: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_rows: usize,
    pub patients: usize,
    pub written_patients: usize,
    pub failed_patients: usize,
    pub variant_records: usize,
    pub samples: usize,
    pub duplicate_evidence: usize,
}

impl From<&ConversionSummary> for Statistics {
    fn from(s: &ConversionSummary) -> Self {
        Statistics {
            total_rows: s.total_rows,
            patients: s.patients,
            written_patients: s.written_patients,
            failed_patients: s.failures.len(),
            variant_records: s.variant_records,
            samples: s.samples,
            duplicate_evidence: s.duplicate_evidence,
        }
    }
}

impl RunReport {
    pub fn new(config: &ConversionConfig, summary: &ConversionSummary) -> Self {
        let timestamp = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        let destination = match &config.destination {
            Destination::Directory(dir) => dir.display().to_string(),
            Destination::Stdout => String::from("stdout"),
        };

        RunReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
            input: InputInfo {
                path: config.input.display().to_string(),
                format: summary.input_format.unwrap_or(config.input_format),
            },
            output: OutputInfo { destination },
            duplicate_policy: config.duplicate_policy,
            statistics: Statistics::from(summary),
            failures: summary.failures.clone(),
        }
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        tracing::info!("Wrote run report to {}", path.display());
        Ok(())
    }
}
