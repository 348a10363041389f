//! Rendering of aggregated variants as VCF text.
//!
//! Only the subset needed downstream is written: a file format line, the
//! column header, and one line per variant with a `GT:AD:DP` column per
//! sample. Genotypes are a fixed heterozygous call; absent samples get a
//! hom-ref placeholder.

use std::fmt::Write;

use crate::aggregate::{Evidence, Variant};

pub const FILE_FORMAT_LINE: &str = "##fileformat=VCFv4.0";
pub const FIXED_COLUMNS: [&str; 9] = [
    "#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT",
];

const MISSING_ID: &str = ".";
const QUAL: &str = "-1";
const FILTER: &str = "PASS";
const INFO: &str = "SOMATIC";
const FORMAT: &str = "GT:AD:DP";
pub const ABSENT_GENOTYPE: &str = "0/0:.:.";

/// Genotype column for a sample with evidence.
pub fn format_genotype(evidence: &Evidence) -> String {
    format!("0/1:{}:{}", evidence.alt_reads, evidence.depth())
}

/// Sorted, deduplicated sample columns.
pub fn sample_columns<I, S>(samples: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut columns: Vec<String> = samples
        .into_iter()
        .map(|sample| sample.as_ref().to_string())
        .collect();
    columns.sort_unstable();
    columns.dedup();
    columns
}

/// Render one patient's document.
///
/// `samples` may come in any order; the columns are sorted here and that
/// order is used for the header and every data line. Variants are written
/// in the order given.
pub fn serialize<I, S>(patient: &str, variants: &[Variant], samples: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let columns = sample_columns(samples);
    tracing::debug!(
        patient,
        variants = variants.len(),
        samples = columns.len(),
        "rendering VCF"
    );

    let mut out = String::new();
    out.push_str(FILE_FORMAT_LINE);
    out.push('\n');

    out.push_str(&FIXED_COLUMNS.join("\t"));
    for sample in &columns {
        out.push('\t');
        out.push_str(sample);
    }
    out.push('\n');

    for variant in variants {
        write_variant_line(&mut out, variant, &columns);
    }
    out
}

fn write_variant_line(out: &mut String, variant: &Variant, columns: &[String]) {
    let key = variant.key();
    // Writing into a String cannot fail
    let _ = write!(
        out,
        "{}\t{}\t{MISSING_ID}\t{}\t{}\t{QUAL}\t{FILTER}\t{INFO}\t{FORMAT}",
        key.chrom, key.pos, key.reference, key.alternate
    );
    for sample in columns {
        out.push('\t');
        match variant.evidence(sample) {
            Some(evidence) => out.push_str(&format_genotype(evidence)),
            None => out.push_str(ABSENT_GENOTYPE),
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{DuplicatePolicy, PatientVariants, aggregate};
    use crate::identifier::IdentifierSplitter;
    use crate::table::Row;

    fn row(id: &str, pos: u64, alt: u64, other: u64) -> Row {
        Row {
            raw_identifier: id.to_string(),
            chrom: "1".to_string(),
            pos,
            reference: "A".to_string(),
            alternate: "T".to_string(),
            alt_count: alt,
            other_count: other,
        }
    }

    fn patient(rows: Vec<Row>) -> PatientVariants {
        aggregate(
            rows.into_iter().map(Ok),
            &IdentifierSplitter::default(),
            DuplicatePolicy::KeepFirst,
        )
        .unwrap()
    }

    #[test]
    fn merged_variant_renders_both_samples() {
        let result = patient(vec![row("P1_S2", 100, 3, 7), row("P1_S1", 100, 5, 10)]);
        let text = serialize("P1", &result.variants, &result.samples);
        assert_eq!(
            text,
            "##fileformat=VCFv4.0\n\
             #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n\
             1\t100\t.\tA\tT\t-1\tPASS\tSOMATIC\tGT:AD:DP\t0/1:5:15\t0/1:3:10\n"
        );
    }

    #[test]
    fn absent_sample_gets_placeholder() {
        let result = patient(vec![row("P1_S1", 100, 5, 10), row("P1_S2", 200, 1, 1)]);
        let text = serialize("P1", &result.variants, &result.samples);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].ends_with("\t0/1:5:15\t0/0:.:."));
        assert!(lines[3].ends_with("\t0/0:.:.\t0/1:1:2"));
    }

    #[test]
    fn sample_order_comes_from_sorting_not_input() {
        let text = serialize("P1", &[], ["b", "a", "C", "a"]);
        let header = text.lines().nth(1).unwrap();
        assert!(header.ends_with("FORMAT\tC\ta\tb"));
    }

    #[test]
    fn no_variants_renders_header_only() {
        let text = serialize("P1", &[], Vec::<String>::new());
        assert_eq!(
            text,
            "##fileformat=VCFv4.0\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\n"
        );
    }

    #[test]
    fn no_samples_still_renders_variant_lines() {
        let result = patient(vec![row("P1_S1", 100, 5, 10)]);
        let text = serialize("P1", &result.variants, Vec::<String>::new());
        let last = text.lines().last().unwrap();
        assert_eq!(last, "1\t100\t.\tA\tT\t-1\tPASS\tSOMATIC\tGT:AD:DP");
    }

    #[test]
    fn large_counts_are_not_truncated() {
        let evidence = Evidence {
            alt_reads: u32::MAX as u64,
            other_reads: 1,
        };
        assert_eq!(format_genotype(&evidence), "0/1:4294967295:4294967296");
    }
}
