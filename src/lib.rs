pub mod bucketing;
pub mod config;
pub mod data_loading;
pub mod error;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod validate;

use serde::Serialize;

/// One row of the tracker export, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub start: String,
    pub value: String,
    pub duration: String,
}

impl RawRecord {
    pub fn new(start: &str, value: &str, duration: &str) -> Self {
        RawRecord {
            start: start.to_string(),
            value: value.to_string(),
            duration: duration.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub datetime: String, // YYYY-MM-DD HH:MM:00 in the target zone
    pub measurement: i64, // mean of the value list
    pub duration: i64,    // sum of the duration list
}

/// One output row per generated bucket. Empty buckets serialize as blank
/// heartrate and duration cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedRow {
    pub datetime: String,
    pub heartrate: Option<i64>,
    pub duration: Option<i64>,
}
