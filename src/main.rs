use anyhow::Result;
use clap::Parser;
use hr_cleaner::config::{Args, PipelineConfig};
use hr_cleaner::data_loading::{column_names, read_raw_csv};
use hr_cleaner::output::{cleaned_output_path, print_n_rows, write_cleaned_csv};
use hr_cleaner::pipeline;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    let args = Args::parse();

    if args.list_columns {
        for name in column_names(&args.input_path)? {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let raw = read_raw_csv(&args.input_path, &config.columns)?;
    println!("Loaded {} rows from {}", raw.len(), args.input_path.display());

    // Everything is materialized before the output file is created
    let result = pipeline::run(&raw, &config)?;
    result.counts.log_summary();
    println!(
        "Produced {} buckets, dropped {} rows",
        result.rows.len(),
        result.counts.dropped_rows()
    );

    let output_path = args
        .output
        .unwrap_or_else(|| cleaned_output_path(&args.input_path));
    write_cleaned_csv(&output_path, &result.rows)?;

    if let Some(n) = args.preview {
        print_n_rows(&result.rows, n);
    }

    Ok(())
}
