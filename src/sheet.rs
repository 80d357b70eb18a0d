use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

/// A sheet export as string cells: the trimmed header row plus one
/// column-name to cell mapping per data row, in file order.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl RawSheet {
    /// Build a sheet from literal header and row slices.
    #[cfg(test)]
    pub fn from_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.trim().to_string()).collect();
        let rows = rows
            .iter()
            .map(|cells| zip_row(&columns, cells.iter().copied()))
            .collect();
        Self { columns, rows }
    }
}

fn zip_row<S: Into<String>>(columns: &[String], cells: impl Iterator<Item = S>) -> HashMap<String, String> {
    let mut row = HashMap::with_capacity(columns.len());
    for (column, cell) in columns.iter().zip(cells) {
        // Duplicate headers: the leftmost column wins.
        row.entry(column.clone()).or_insert_with(|| cell.into());
    }
    row
}

pub fn read_csv(path: &Path) -> Result<RawSheet> {
    let file = std::fs::File::open(path)?;
    tracing::debug!(path = %path.display(), "reading sheet export");
    read_csv_from(std::io::BufReader::new(file))
}

/// Cells are decoded as UTF-8; invalid bytes become U+FFFD rather than
/// failing the whole sheet.
pub fn read_csv_from<R: Read>(reader: R) -> Result<RawSheet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();
    let mut rows = Vec::new();
    let mut lossy_rows = 0usize;
    for result in rdr.byte_records() {
        let record = result?;
        let cells: Vec<Cow<'_, str>> = record.iter().map(String::from_utf8_lossy).collect();
        if cells.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if cells.iter().any(|cell| matches!(cell, Cow::Owned(_))) {
            lossy_rows += 1;
        }
        rows.push(zip_row(&columns, cells.into_iter()));
    }
    if lossy_rows > 0 {
        tracing::warn!(rows = lossy_rows, "invalid UTF-8 in sheet export replaced");
    }
    tracing::debug!(columns = columns.len(), rows = rows.len(), "sheet loaded");
    Ok(RawSheet { columns, rows })
}
