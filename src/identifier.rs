//! Splitting of combined `<patient>_<sample>` identifiers.
//!
//! Spreadsheet exports carry the patient and the sample in one column. The
//! patient is always the token before the first separator. The sample is the
//! remainder, except for identifiers that start with the nested marker
//! (`M_` by default), where only the last separator-delimited token is kept.

use thiserror::Error;

pub const DEFAULT_SEPARATOR: char = '_';
pub const DEFAULT_NESTED_MARKER: &str = "M_";

/// Patient and sample parts of a combined identifier.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Identifier {
    pub patient_id: String,
    pub sample_id: String,
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum IdentifierError {
    #[error("identifier '{raw}' has no '{separator}' separator")]
    MissingSeparator { raw: String, separator: char },
    #[error("identifier '{raw}' has an empty patient part")]
    EmptyPatient { raw: String },
    #[error("identifier '{raw}' has an empty sample part")]
    EmptySample { raw: String },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IdentifierSplitter {
    separator: char,
    nested_marker: String,
}

impl Default for IdentifierSplitter {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            nested_marker: DEFAULT_NESTED_MARKER.to_string(),
        }
    }
}

impl IdentifierSplitter {
    pub fn new(separator: char, nested_marker: impl Into<String>) -> Self {
        Self {
            separator,
            nested_marker: nested_marker.into(),
        }
    }

    /// Split `raw` into patient and sample ids.
    ///
    /// Fails instead of guessing when the separator is missing or either
    /// part would be empty.
    pub fn split(&self, raw: &str) -> Result<Identifier, IdentifierError> {
        let (patient, remainder) =
            raw.split_once(self.separator)
                .ok_or_else(|| IdentifierError::MissingSeparator {
                    raw: raw.to_string(),
                    separator: self.separator,
                })?;

        if patient.is_empty() {
            return Err(IdentifierError::EmptyPatient {
                raw: raw.to_string(),
            });
        }

        let sample = if !self.nested_marker.is_empty() && raw.starts_with(&self.nested_marker) {
            // split_once succeeded, so rsplit always yields a token
            raw.rsplit(self.separator).next().unwrap_or_default()
        } else {
            remainder
        };

        if sample.is_empty() {
            return Err(IdentifierError::EmptySample {
                raw: raw.to_string(),
            });
        }

        Ok(Identifier {
            patient_id: patient.to_string(),
            sample_id: sample.to_string(),
        })
    }

    /// Patient part only; same validation as [`split`](Self::split).
    pub fn patient_id(&self, raw: &str) -> Result<String, IdentifierError> {
        self.split(raw).map(|identifier| identifier.patient_id)
    }
}
