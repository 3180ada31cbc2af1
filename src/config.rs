use crate::error::ConfigError;
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Clean heart-rate tracker exports into fixed-width time buckets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the raw heart-rate CSV export
    #[arg(default_value = "raw_hr_hr.csv")]
    pub input_path: PathBuf,

    /// JSON file overriding the built-in pipeline configuration
    #[arg(long, env = "HR_CLEAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output CSV path, defaults to cleaned_<input file name>
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Print the first N cleaned rows after writing
    #[arg(long)]
    pub preview: Option<usize>,

    /// List the input column names and exit
    #[arg(long)]
    pub list_columns: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum IntervalUnit {
    Minute,
    Hour,
}

impl FromStr for IntervalUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" | "min" | "minute" | "minutes" => Ok(IntervalUnit::Minute),
            "h" | "hour" | "hours" => Ok(IntervalUnit::Hour),
            _ => Err(format!(
                "Invalid interval unit: {}. Use minute (m) or hour (h)",
                s
            )),
        }
    }
}

impl TryFrom<String> for IntervalUnit {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub value: u32,
    pub unit: IntervalUnit,
}

impl Interval {
    pub fn minutes(&self) -> u32 {
        match self.unit {
            IntervalUnit::Minute => self.value,
            IntervalUnit::Hour => self.value.saturating_mul(60),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.minutes()))
    }

    /// Buckets are keyed by flooring minutes since midnight, so the width
    /// has to tile a whole day.
    pub fn validate(&self) -> Result<NonZeroU32, ConfigError> {
        let minutes = NonZeroU32::new(self.minutes()).ok_or(ConfigError::ZeroInterval)?;
        if MINUTES_PER_DAY % minutes.get() != 0 {
            return Err(ConfigError::IntervalNotDayAligned(minutes.get()));
        }
        Ok(minutes)
    }
}

/// Type tags a normalized field may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "str", alias = "string")]
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub timestamp: String,
    pub value: String,
    pub duration: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            timestamp: "start".to_string(),
            value: "value".to_string(),
            duration: "duration".to_string(),
        }
    }
}

/// A declared span, as written in the config file. Both ends are local
/// wall-clock times in the target zone; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: &str, end: &str) -> Self {
        DateRange {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

/// A validated range ready for bucket generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub interval: Interval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub columns: ColumnNames,
    pub target_timezone: String,
    pub bucket_interval: Interval,
    pub date_ranges: Vec<DateRange>,
    pub month_filter: BTreeSet<String>,
    pub expected_types: BTreeSet<FieldType>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            columns: ColumnNames::default(),
            target_timezone: "US/Pacific".to_string(),
            bucket_interval: Interval {
                value: 10,
                unit: IntervalUnit::Minute,
            },
            date_ranges: vec![
                DateRange::new("2021-10-01 00:00:00", "2021-12-01 00:00:00"),
                DateRange::new("2022-03-01 00:00:00", "2022-05-01 00:00:00"),
            ],
            month_filter: ["2022-04-", "2022-03-", "2021-10-", "2021-11-"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            expected_types: [FieldType::Int, FieldType::Text].into_iter().collect(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn target_zone(&self) -> Result<Tz, ConfigError> {
        self.target_timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.target_timezone.clone()))
    }

    /// Parses and checks every declared range. Ranges keep their declared
    /// order but may not overlap.
    pub fn bucket_ranges(&self) -> Result<Vec<BucketRange>, ConfigError> {
        let minutes = self.bucket_interval.validate()?.get();
        let mut ranges = Vec::with_capacity(self.date_ranges.len());

        for declared in &self.date_ranges {
            let start = parse_config_datetime(&declared.start)?;
            let end = parse_config_datetime(&declared.end)?;
            if end < start {
                return Err(ConfigError::NonMonotonicRange {
                    start: declared.start.clone(),
                    end: declared.end.clone(),
                });
            }
            let minute_of_day = start.hour() * 60 + start.minute();
            if start.second() != 0 || minute_of_day % minutes != 0 {
                return Err(ConfigError::MisalignedRangeStart {
                    start: declared.start.clone(),
                    minutes,
                });
            }
            ranges.push(BucketRange {
                start,
                end,
                interval: self.bucket_interval,
            });
        }

        for (i, a) in ranges.iter().enumerate() {
            for b in &ranges[i + 1..] {
                if a.start < b.end && b.start < a.end {
                    let at = a.start.max(b.start);
                    return Err(ConfigError::OverlappingRanges(
                        at.format(DATETIME_FORMAT).to_string(),
                    ));
                }
            }
        }

        Ok(ranges)
    }
}

fn parse_config_datetime(s: &str) -> Result<NaiveDateTime, ConfigError> {
    NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT)
        .map_err(|_| ConfigError::InvalidDate(s.to_string()))
}
