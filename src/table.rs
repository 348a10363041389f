use std::{io, num::ParseIntError};

use thiserror::Error;

/// One reading of a variant in one sample, as exported from the spreadsheet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    pub raw_identifier: String,
    pub chrom: String,
    pub pos: u64,
    pub reference: String,
    pub alternate: String,
    pub alt_count: u64,
    /// Second read-count column; reference-only or total depth depending on the export.
    pub other_count: u64,
}

/// Header labels of the columns a [`Row`] is read from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Columns {
    pub identifier: String,
    pub chrom: String,
    pub position: String,
    pub reference: String,
    pub alternate: String,
    pub alt_count: String,
    pub other_count: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            identifier: String::from("SampleID"),
            chrom: String::from("Chr"),
            position: String::from("Position"),
            reference: String::from("Ref"),
            alternate: String::from("Alt"),
            alt_count: String::from("AltCount"),
            other_count: String::from("RefCount"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    identifier: usize,
    chrom: usize,
    position: usize,
    reference: usize,
    alternate: usize,
    alt_count: usize,
    other_count: usize,
}

impl ColumnIndex {
    fn resolve(header: &[&str], columns: &Columns) -> Result<Self, HeaderError> {
        let find = |label: &str| {
            header
                .iter()
                .position(|field| field.trim() == label)
                .ok_or_else(|| HeaderError::MissingColumn(label.to_string()))
        };

        Ok(Self {
            identifier: find(&columns.identifier)?,
            chrom: find(&columns.chrom)?,
            position: find(&columns.position)?,
            reference: find(&columns.reference)?,
            alternate: find(&columns.alternate)?,
            alt_count: find(&columns.alt_count)?,
            other_count: find(&columns.other_count)?,
        })
    }
}

/// Cell access shared by delimited records and worksheet rows.
pub(crate) trait Cells {
    fn cell(&self, index: usize) -> Option<&str>;

    fn is_blank(&self) -> bool;
}

impl Cells for csv::StringRecord {
    fn cell(&self, index: usize) -> Option<&str> {
        self.get(index)
    }

    fn is_blank(&self) -> bool {
        self.iter().all(str::is_empty)
    }
}

impl Cells for [String] {
    fn cell(&self, index: usize) -> Option<&str> {
        self.get(index).map(String::as_str)
    }

    fn is_blank(&self) -> bool {
        self.iter().all(String::is_empty)
    }
}

/// Configured columns resolved against one header.
#[derive(Debug, Clone)]
pub(crate) struct RowLayout {
    index: ColumnIndex,
    columns: Columns,
}

impl RowLayout {
    pub(crate) fn resolve(header: &[&str], columns: Columns) -> Result<Self, HeaderError> {
        let index = ColumnIndex::resolve(header, &columns)?;
        Ok(Self { index, columns })
    }

    /// Parse one non-blank data row found at `line`.
    pub(crate) fn parse<C: Cells + ?Sized>(&self, cells: &C, line: u64) -> Result<Row, ParseError> {
        self.parse_cells(cells).map_err(|kind| ParseError {
            line,
            identifier: cells
                .cell(self.index.identifier)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            kind,
        })
    }

    fn parse_cells<C: Cells + ?Sized>(&self, cells: &C) -> Result<Row, ParseErrorKind> {
        let raw_identifier = self.text(cells, self.index.identifier, &self.columns.identifier)?;
        let chrom = self.text(cells, self.index.chrom, &self.columns.chrom)?;
        let pos = self.integer(cells, self.index.position, &self.columns.position)?;
        let reference = self.text(cells, self.index.reference, &self.columns.reference)?;
        let alternate = self.text(cells, self.index.alternate, &self.columns.alternate)?;
        let alt_count = self.integer(cells, self.index.alt_count, &self.columns.alt_count)?;
        let other_count = self.integer(cells, self.index.other_count, &self.columns.other_count)?;

        if alt_count.checked_add(other_count).is_none() {
            return Err(ParseErrorKind::DepthOverflow {
                alt_count,
                other_count,
            });
        }

        Ok(Row {
            raw_identifier,
            chrom,
            pos,
            reference,
            alternate,
            alt_count,
            other_count,
        })
    }

    fn text<C: Cells + ?Sized>(
        &self,
        cells: &C,
        index: usize,
        column: &str,
    ) -> Result<String, ParseErrorKind> {
        match cells.cell(index) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(ParseErrorKind::MissingField {
                column: column.to_string(),
            }),
        }
    }

    fn integer<C: Cells + ?Sized>(
        &self,
        cells: &C,
        index: usize,
        column: &str,
    ) -> Result<u64, ParseErrorKind> {
        let value = self.text(cells, index, column)?;
        value
            .parse::<u64>()
            .map_err(|source| ParseErrorKind::InvalidInteger {
                column: column.to_string(),
                value,
                source,
            })
    }
}

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("failed to read header: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("failed to open workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),
    #[error("workbook has no worksheet")]
    NoWorksheet,
    #[error("header has no '{0}' column")]
    MissingColumn(String),
}

/// Errors that can arise while reading a data row.
#[derive(Debug, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: u64,
    /// Raw identifier cell, when it could be read; lets the error be attributed to a patient.
    pub identifier: Option<String>,
    #[source]
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error("malformed record")]
    Csv(#[from] csv::Error),
    #[error("missing value in column '{column}'")]
    MissingField { column: String },
    #[error("invalid integer '{value}' in column '{column}': {source}")]
    InvalidInteger {
        column: String,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("read depth {alt_count} + {other_count} overflows")]
    DepthOverflow { alt_count: u64, other_count: u64 },
}

/// Iterator over the data rows of a delimited table.
pub struct Reader<R> {
    records: csv::StringRecordsIntoIter<R>,
    layout: RowLayout,
}

impl<R> Reader<R>
where
    R: io::Read,
{
    /// Reads the header line and resolves `columns` against it.
    pub fn new(inner: R, delimiter: u8, columns: Columns) -> Result<Self, HeaderError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(inner);

        let header: Vec<&str> = reader.headers()?.iter().collect();
        let layout = RowLayout::resolve(&header, columns)?;

        Ok(Self {
            records: reader.into_records(),
            layout,
        })
    }
}

impl<R> Iterator for Reader<R>
where
    R: io::Read,
{
    type Item = Result<Row, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    return Some(Err(ParseError {
                        line,
                        identifier: None,
                        kind: ParseErrorKind::Csv(e),
                    }));
                }
            };

            // Spreadsheet exports often pad the sheet with rows of empty cells.
            if record.is_blank() {
                continue;
            }

            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Some(self.layout.parse(&record, line));
        }
    }
}
