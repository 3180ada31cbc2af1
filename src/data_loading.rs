use crate::config::ColumnNames;
use crate::RawRecord;
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow!("Missing column {:?} (found: {:?})", name, headers))
}

/// Reads the three configured columns of every row. A row too short to hold
/// them is kept with empty cells so normalization drops it like any other
/// malformed row.
pub fn read_raw_table<R: Read>(reader: R, columns: &ColumnNames) -> Result<Vec<RawRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true) // Handle variable number of fields
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let start_idx = column_index(&headers, &columns.timestamp)?;
    let value_idx = column_index(&headers, &columns.value)?;
    let duration_idx = column_index(&headers, &columns.duration)?;

    let mut data = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cell = |i: usize| record.get(i).unwrap_or_default().to_string();
        data.push(RawRecord {
            start: cell(start_idx),
            value: cell(value_idx),
            duration: cell(duration_idx),
        });
    }

    Ok(data)
}

pub fn read_raw_csv(path: &Path, columns: &ColumnNames) -> Result<Vec<RawRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    read_raw_table(file, columns)
        .with_context(|| format!("Failed to read CSV: {}", path.display()))
}

pub fn column_names(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    Ok(rdr.headers()?.iter().map(|h| h.to_string()).collect())
}
