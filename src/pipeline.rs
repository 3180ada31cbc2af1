use crate::bucketing::{aggregate, assign, generate_buckets};
use crate::config::PipelineConfig;
use crate::error::{ConfigError, ErrorCounts};
use crate::normalize::normalize_rows;
use crate::validate::filter_rows;
use crate::{AggregatedRow, RawRecord};
use log::debug;

#[derive(Debug)]
pub struct PipelineOutput {
    pub rows: Vec<AggregatedRow>,
    pub counts: ErrorCounts,
}

/// Normalize, validate, sort and bucket `raw`. Configuration problems are
/// reported before any row is looked at; row-level problems only shrink
/// the output and show up in `counts`.
pub fn run(raw: &[RawRecord], config: &PipelineConfig) -> Result<PipelineOutput, ConfigError> {
    let zone = config.target_zone()?;
    let ranges = config.bucket_ranges()?;
    let interval_minutes = config.bucket_interval.validate()?;
    let mut bucket_map = generate_buckets(&ranges)?;
    debug!("Generated {} buckets over {} ranges", bucket_map.len(), ranges.len());

    let mut counts = ErrorCounts::default();

    let normalized = normalize_rows(raw, &zone);
    let mut records = filter_rows(
        normalized,
        &config.expected_types,
        &config.month_filter,
        &mut counts,
    );
    debug!("{} of {} rows survived validation", records.len(), raw.len());

    // stable: equal datetimes keep input order
    records.sort_by(|a, b| a.datetime.cmp(&b.datetime));

    assign(&mut bucket_map, records, interval_minutes, &mut counts);
    let rows = aggregate(bucket_map, &mut counts);

    Ok(PipelineOutput { rows, counts })
}
