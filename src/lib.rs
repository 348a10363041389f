#![doc = include_str!("../README.md")]

pub mod aggregate;
pub mod cli;
pub mod conversion;
pub mod identifier;
pub mod input;
pub mod output;
pub mod report;
pub mod sheet;
pub mod smart_reader;
pub mod table;
pub mod vcf;

pub use conversion::{
    ConversionConfig, ConversionSummary, Destination, PatientFailure, convert_rows,
    convert_table_file,
};
