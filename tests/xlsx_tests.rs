use std::{fs, path::Path, path::PathBuf};

use patient_vcf::{
    ConversionConfig, Destination, aggregate::DuplicatePolicy, convert_table_file,
    identifier::IdentifierSplitter, input::InputFormat, table::Columns,
};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

const HEADER: [&str; 7] = [
    "SampleID", "Chr", "Position", "Ref", "Alt", "AltCount", "RefCount",
];

enum Cell {
    Text(&'static str),
    Number(f64),
}

/// Writes a workbook whose first sheet holds `HEADER` and `rows`, the way
/// Excel stores them: numbers as floats.
fn write_workbook(path: &Path, rows: &[Vec<Cell>]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, label) in HEADER.iter().enumerate() {
        sheet.write_string(0, col as u16, *label).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        let r = r as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(text) => sheet.write_string(r, col as u16, *text).unwrap(),
                Cell::Number(value) => sheet.write_number(r, col as u16, *value).unwrap(),
            };
        }
    }
    workbook.save(path).unwrap();
}

fn base_config(input: PathBuf, output: PathBuf) -> ConversionConfig {
    ConversionConfig {
        input,
        input_format: InputFormat::Auto,
        columns: Columns::default(),
        splitter: IdentifierSplitter::default(),
        duplicate_policy: DuplicatePolicy::KeepFirst,
        destination: Destination::Directory(output),
    }
}

fn call(id: &'static str, chrom: Cell, pos: f64, alt: f64, other: f64) -> Vec<Cell> {
    vec![
        Cell::Text(id),
        chrom,
        Cell::Number(pos),
        Cell::Text("A"),
        Cell::Text("T"),
        Cell::Number(alt),
        Cell::Number(other),
    ]
}

#[test]
fn workbook_converts_end_to_end() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("variants.xlsx");
    write_workbook(
        &input,
        &[
            call("P1_S2", Cell::Number(17.0), 100.0, 3.0, 7.0),
            call("P1_S1", Cell::Number(17.0), 100.0, 5.0, 10.0),
            call("P2_S1", Cell::Text("X"), 2500.0, 4.0, 4.0),
        ],
    );
    let output = dir.path().join("vcfs");

    let summary = convert_table_file(&base_config(input, output.clone())).unwrap();
    assert_eq!(summary.input_format, Some(InputFormat::Xlsx));
    assert_eq!(summary.total_rows, 3);
    assert_eq!(summary.written_patients, 2);

    let p1 = fs::read_to_string(output.join("P1.vcf")).unwrap();
    assert_eq!(
        p1,
        "##fileformat=VCFv4.0\n\
         #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n\
         17\t100\t.\tA\tT\t-1\tPASS\tSOMATIC\tGT:AD:DP\t0/1:5:15\t0/1:3:10\n"
    );

    let p2 = fs::read_to_string(output.join("P2.vcf")).unwrap();
    assert!(p2.ends_with("X\t2500\t.\tA\tT\t-1\tPASS\tSOMATIC\tGT:AD:DP\t0/1:4:8\n"));
}

#[test]
fn workbook_without_extension_is_sniffed() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("variants_download");
    write_workbook(&input, &[call("P3_S1", Cell::Number(1.0), 42.0, 1.0, 2.0)]);
    let output = dir.path().join("vcfs");

    let summary = convert_table_file(&base_config(input, output.clone())).unwrap();
    assert_eq!(summary.input_format, Some(InputFormat::Xlsx));
    assert!(output.join("P3.vcf").exists());
}

#[test]
fn fractional_count_in_workbook_fails_only_its_patient() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("variants.xlsx");
    write_workbook(
        &input,
        &[
            call("P1_S1", Cell::Number(1.0), 10.0, 2.5, 3.0),
            call("P2_S1", Cell::Number(1.0), 10.0, 2.0, 3.0),
        ],
    );
    let output = dir.path().join("vcfs");

    let summary = convert_table_file(&base_config(input, output.clone())).unwrap();
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].patient, "P1");
    assert!(summary.failures[0].error.contains("AltCount"));
    assert!(!output.join("P1.vcf").exists());
    assert!(output.join("P2.vcf").exists());
}

#[test]
fn workbook_missing_a_column_aborts() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("variants.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, label) in HEADER[..6].iter().enumerate() {
        sheet.write_string(0, col as u16, *label).unwrap();
    }
    workbook.save(&input).unwrap();
    let output = dir.path().join("vcfs");

    let err = convert_table_file(&base_config(input, output.clone())).unwrap_err();
    assert!(format!("{err:#}").contains("RefCount"));
    assert!(!output.exists());
}
