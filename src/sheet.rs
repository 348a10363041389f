//! Reading rows straight from the first worksheet of an `.xlsx` workbook.
//!
//! Cells are rendered to text and handed to the same header lookup and row
//! parser as delimited exports, so both sources fail the same way.

use std::io::{Cursor, Read};

use calamine::{Data, Range, Reader as _, Xlsx};

use crate::table::{Cells as _, Columns, HeaderError, ParseError, Row, RowLayout};

/// Leading bytes of a zip archive, which every `.xlsx` workbook is.
pub const XLSX_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Iterator over the data rows of a worksheet.
pub struct SheetReader {
    rows: std::vec::IntoIter<(u64, Vec<String>)>,
    layout: RowLayout,
}

impl SheetReader {
    /// Loads the whole workbook from `inner` and resolves `columns` against
    /// the first row of its first worksheet.
    pub fn new<R: Read>(mut inner: R, columns: Columns) -> Result<Self, HeaderError> {
        let mut bytes = Vec::new();
        inner.read_to_end(&mut bytes)?;

        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(HeaderError::NoWorksheet)??;
        tracing::debug!(
            rows = range.height(),
            columns = range.width(),
            "loaded first worksheet"
        );

        let mut rows = text_rows(&range).into_iter();
        let header = rows.next().map(|(_, cells)| cells).unwrap_or_default();
        let header: Vec<&str> = header.iter().map(String::as_str).collect();
        let layout = RowLayout::resolve(&header, columns)?;

        Ok(Self { rows, layout })
    }
}

impl Iterator for SheetReader {
    type Item = Result<Row, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (line, cells) = self.rows.next()?;
            if cells.as_slice().is_blank() {
                continue;
            }
            return Some(self.layout.parse(cells.as_slice(), line));
        }
    }
}

/// Every row of `range` as trimmed text, paired with its 1-based sheet row.
fn text_rows(range: &Range<Data>) -> Vec<(u64, Vec<String>)> {
    let first = range.start().map(|(row, _)| u64::from(row)).unwrap_or(0);
    range
        .rows()
        .zip(first + 1..)
        .map(|(cells, line)| (line, cells.iter().map(cell_text).collect()))
        .collect()
}

/// Render one cell the way it reads in the sheet.
///
/// Excel stores every number as a float, so integral values lose their `.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{f:.0}")
        }
        other => other.to_string().trim().to_string(),
    }
}
