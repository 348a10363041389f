//! Per-patient merging of rows into distinct variants.
//!
//! Rows sharing `(chrom, pos, ref, alt)` collapse into one [`Variant`]
//! carrying read evidence for every sample that reported it. Variants are
//! kept in first-seen order, which is the order they are written in.

use std::collections::{BTreeSet, HashMap, hash_map::Entry};
use std::fmt;

use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;

use crate::identifier::{IdentifierError, IdentifierSplitter};
use crate::table::{ParseError, Row};

/// Identity of a variant: exact equality on all four fields.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct VariantKey {
    pub chrom: String,
    pub pos: u64,
    pub reference: String,
    pub alternate: String,
}

impl VariantKey {
    pub fn from_row(row: &Row) -> Self {
        Self {
            chrom: row.chrom.clone(),
            pos: row.pos,
            reference: row.reference.clone(),
            alternate: row.alternate.clone(),
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {}>{}",
            self.chrom, self.pos, self.reference, self.alternate
        )
    }
}

/// Read counts one sample contributed to a variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Evidence {
    pub alt_reads: u64,
    pub other_reads: u64,
}

impl Evidence {
    /// `DP` as written: alt reads plus the second count column, whatever that column holds.
    pub fn depth(&self) -> u64 {
        self.alt_reads.saturating_add(self.other_reads)
    }
}

#[derive(Clone, Debug)]
pub struct Variant {
    key: VariantKey,
    samples: Vec<String>,
    evidence: HashMap<String, Evidence>,
}

impl Variant {
    pub fn new(key: VariantKey) -> Self {
        Self {
            key,
            samples: Vec::new(),
            evidence: HashMap::new(),
        }
    }

    pub fn key(&self) -> &VariantKey {
        &self.key
    }

    /// Samples in the order they were first observed.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn evidence(&self, sample: &str) -> Option<&Evidence> {
        self.evidence.get(sample)
    }

    pub fn is_present_in(&self, sample: &str) -> bool {
        self.evidence.contains_key(sample)
    }

    fn add_sample(&mut self, sample: &str) {
        if !self.samples.iter().any(|s| s == sample) {
            self.samples.push(sample.to_string());
        }
    }

    /// Record evidence for `sample`, resolving a second write per `policy`.
    fn add_evidence(
        &mut self,
        sample: &str,
        evidence: Evidence,
        policy: DuplicatePolicy,
    ) -> Result<Option<DuplicateEvidence>, AggregateError> {
        self.add_sample(sample);

        let mut existing = match self.evidence.entry(sample.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(evidence);
                return Ok(None);
            }
            Entry::Occupied(slot) => slot,
        };

        let first = *existing.get();
        match policy {
            DuplicatePolicy::KeepFirst => {}
            DuplicatePolicy::KeepLast => {
                existing.insert(evidence);
            }
            DuplicatePolicy::Reject => {
                return Err(AggregateError::DuplicateEvidence {
                    variant: self.key.clone(),
                    sample: sample.to_string(),
                });
            }
        }

        Ok(Some(DuplicateEvidence {
            variant: self.key.clone(),
            sample: sample.to_string(),
            first,
            second: evidence,
            policy,
        }))
    }
}

/// What to do when a sample reports the same variant twice.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the first evidence and warn
    #[default]
    KeepFirst,
    /// Replace with the later evidence and warn
    KeepLast,
    /// Fail the patient
    Reject,
}

/// A recovered duplicate contribution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DuplicateEvidence {
    pub variant: VariantKey,
    pub sample: String,
    pub first: Evidence,
    pub second: Evidence,
    pub policy: DuplicatePolicy,
}

impl DuplicateEvidence {
    pub fn kept(&self) -> Evidence {
        match self.policy {
            DuplicatePolicy::KeepLast => self.second,
            DuplicatePolicy::KeepFirst | DuplicatePolicy::Reject => self.first,
        }
    }
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("malformed row: {0}")]
    MalformedRow(#[from] ParseError),
    #[error(transparent)]
    MalformedIdentifier(#[from] IdentifierError),
    #[error("sample {sample} contributes evidence twice to {variant}")]
    DuplicateEvidence { variant: VariantKey, sample: String },
}

/// Aggregated variants of one patient.
#[derive(Clone, Debug, Default)]
pub struct PatientVariants {
    pub variants: Vec<Variant>,
    pub samples: BTreeSet<String>,
    pub duplicates: Vec<DuplicateEvidence>,
}

/// Incremental builder for [`PatientVariants`].
pub struct Aggregator<'a> {
    splitter: &'a IdentifierSplitter,
    policy: DuplicatePolicy,
    index: HashMap<VariantKey, usize>,
    result: PatientVariants,
}

impl<'a> Aggregator<'a> {
    pub fn new(splitter: &'a IdentifierSplitter, policy: DuplicatePolicy) -> Self {
        Self {
            splitter,
            policy,
            index: HashMap::new(),
            result: PatientVariants::default(),
        }
    }

    pub fn push(&mut self, row: &Row) -> Result<(), AggregateError> {
        let sample = self.splitter.split(&row.raw_identifier)?.sample_id;
        let key = VariantKey::from_row(row);
        let evidence = Evidence {
            alt_reads: row.alt_count,
            other_reads: row.other_count,
        };

        let variants = &mut self.result.variants;
        let slot = *self.index.entry(key).or_insert_with_key(|key| {
            variants.push(Variant::new(key.clone()));
            variants.len() - 1
        });

        if let Some(duplicate) = variants[slot].add_evidence(&sample, evidence, self.policy)? {
            tracing::warn!(
                sample = %duplicate.sample,
                variant = %duplicate.variant,
                policy = ?duplicate.policy,
                "sample contributes evidence twice to the same variant",
            );
            self.result.duplicates.push(duplicate);
        }
        self.result.samples.insert(sample);
        Ok(())
    }

    pub fn finish(self) -> PatientVariants {
        self.result
    }
}

/// Aggregate one patient's rows, failing on the first malformed row.
pub fn aggregate<I>(
    rows: I,
    splitter: &IdentifierSplitter,
    policy: DuplicatePolicy,
) -> Result<PatientVariants, AggregateError>
where
    I: IntoIterator<Item = Result<Row, ParseError>>,
{
    let mut aggregator = Aggregator::new(splitter, policy);
    for row in rows {
        aggregator.push(&row?)?;
    }
    Ok(aggregator.finish())
}
