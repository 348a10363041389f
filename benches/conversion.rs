use std::{fs, io::Cursor, path::PathBuf};

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use patient_vcf::{
    ConversionConfig, Destination, convert_table_file,
    aggregate::{DuplicatePolicy, aggregate},
    identifier::IdentifierSplitter,
    input::InputFormat,
    table::{self, Columns, Row},
    vcf,
};
use tempfile::tempdir;

const HEADER: &str = "SampleID,Chr,Position,Ref,Alt,AltCount,RefCount\n";

/// `patients` patients with `samples` samples each, all sharing `sites` sites.
fn table_text(patients: usize, samples: usize, sites: usize) -> String {
    let mut content = String::from(HEADER);
    for p in 0..patients {
        for s in 0..samples {
            for site in 1..=sites {
                content.push_str(&format!("P{p}_S{s},1,{site},A,T,{s},{site}\n"));
            }
        }
    }
    content
}

fn rows(samples: usize, sites: usize) -> Vec<Row> {
    let text = table_text(1, samples, sites);
    table::Reader::new(Cursor::new(text.into_bytes()), b',', Columns::default())
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

fn bench_row_reading(c: &mut Criterion) {
    let text = table_text(1, 8, 1_000);
    c.bench_function("read_8000_rows", |b| {
        b.iter(|| {
            let reader =
                table::Reader::new(Cursor::new(text.as_bytes()), b',', Columns::default())
                    .unwrap();
            black_box(reader.count());
        });
    });
}

fn bench_aggregation(c: &mut Criterion) {
    let splitter = IdentifierSplitter::default();
    let mut group = c.benchmark_group("aggregate");
    for &sites in &[100usize, 1_000, 10_000] {
        let input = rows(8, sites);
        group.bench_with_input(BenchmarkId::from_parameter(sites), &input, |b, input| {
            b.iter_batched(
                || input.clone(),
                |rows| {
                    black_box(
                        aggregate(rows.into_iter().map(Ok), &splitter, DuplicatePolicy::KeepFirst)
                            .unwrap(),
                    )
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let splitter = IdentifierSplitter::default();
    let result = aggregate(
        rows(16, 5_000).into_iter().map(Ok),
        &splitter,
        DuplicatePolicy::KeepFirst,
    )
    .unwrap();

    c.bench_function("serialize_5000_variants_16_samples", |b| {
        b.iter(|| black_box(vcf::serialize("P0", &result.variants, &result.samples)));
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let input: PathBuf = dir.path().join("calls.csv");
    fs::write(&input, table_text(20, 4, 500)).unwrap();

    c.bench_function("convert_20_patients", |b| {
        b.iter_batched(
            || {
                let out = tempdir().unwrap();
                let config = ConversionConfig {
                    input: input.clone(),
                    input_format: InputFormat::Csv,
                    columns: Columns::default(),
                    splitter: IdentifierSplitter::default(),
                    duplicate_policy: DuplicatePolicy::KeepFirst,
                    destination: Destination::Directory(out.path().join("vcfs")),
                };
                (out, config)
            },
            |(_out, config)| black_box(convert_table_file(&config).unwrap()),
            BatchSize::PerIteration,
        );
    });
}

criterion_group!(
    benches,
    bench_row_reading,
    bench_aggregation,
    bench_serialization,
    bench_full_pipeline
);
criterion_main!(benches);
