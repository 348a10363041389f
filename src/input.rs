use std::io::{self, BufRead};
use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;

use crate::sheet::XLSX_MAGIC;

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Comma-separated export of the spreadsheet
    Csv,
    /// Tab-separated export of the spreadsheet
    Tsv,
    /// The `.xlsx` workbook itself; rows come from its first worksheet
    Xlsx,
    /// Detect format automatically
    Auto,
}

impl InputFormat {
    /// Decide from the file name alone; `None` when the name says nothing.
    pub fn from_path(path: &Path) -> Option<Self> {
        let filename = path.file_name()?.to_string_lossy().to_lowercase();
        let filename = filename.strip_suffix(".gz").unwrap_or(&filename);

        if filename.ends_with(".xlsx") {
            Some(Self::Xlsx)
        } else if filename.ends_with(".csv") {
            Some(Self::Csv)
        } else if filename.ends_with(".tsv")
            || filename.ends_with(".txt")
            || filename.ends_with(".tab")
        {
            Some(Self::Tsv)
        } else {
            None
        }
    }

    /// Sniff the stream: zip magic means a workbook, otherwise a tab in the
    /// header line means TSV and anything else CSV.
    pub fn sniff<R: BufRead>(reader: &mut R) -> io::Result<Self> {
        let buf = reader.fill_buf()?;
        if buf.starts_with(&XLSX_MAGIC) {
            return Ok(Self::Xlsx);
        }
        let first_line = buf.split(|&b| b == b'\n').next().unwrap_or_default();
        if first_line.contains(&b'\t') {
            Ok(Self::Tsv)
        } else {
            Ok(Self::Csv)
        }
    }

    /// Resolve `Auto` against the path and, failing that, the stream contents.
    pub fn resolve<R: BufRead>(self, path: &Path, reader: &mut R) -> io::Result<Self> {
        match self {
            Self::Auto => match Self::from_path(path) {
                Some(format) => Ok(format),
                None => Self::sniff(reader),
            },
            other => Ok(other),
        }
    }

    /// Field delimiter of the text formats.
    pub fn delimiter(self) -> u8 {
        match self {
            Self::Tsv => b'\t',
            Self::Csv | Self::Xlsx | Self::Auto => b',',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Xlsx => "xlsx",
            Self::Auto => "auto",
        }
    }
}
