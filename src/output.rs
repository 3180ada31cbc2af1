use crate::AggregatedRow;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// `dir/raw_hr_hr.csv` becomes `dir/cleaned_raw_hr_hr.csv`.
pub fn cleaned_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("results.csv");
    input.with_file_name(format!("cleaned_{}", name))
}

pub fn write_cleaned_table<W: Write>(writer: W, rows: &[AggregatedRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    // Header is written explicitly so an empty result still has one
    writer.write_record(["datetime", "heartrate", "duration"])?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_cleaned_csv(path: &Path, rows: &[AggregatedRow]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    println!("Writing results to {}", path.display());
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    write_cleaned_table(file, rows)
}

pub fn format_row(row: &AggregatedRow) -> String {
    let cell = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_else(|| "None".to_string());
    format!(
        "datetime:  {}, heartrate:  {}, duration:  {}",
        row.datetime,
        cell(row.heartrate),
        cell(row.duration)
    )
}

/// Prints up to `n` rows, one `column: value` line each.
pub fn print_n_rows(rows: &[AggregatedRow], n: usize) {
    for row in rows.iter().take(n) {
        println!("{}", format_row(row));
    }
}
