use crate::config::{BucketRange, DATETIME_FORMAT};
use crate::error::{ConfigError, ErrorCounts, RowError};
use crate::{AggregatedRow, NormalizedRecord};
use chrono::{NaiveDateTime, Timelike};
use std::collections::HashMap;
use std::num::NonZeroU32;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBucket {
    pub key: String,
    pub members: Vec<NormalizedRecord>,
}

/// Every bucket of the configured spans, in generation order. Keys are
/// created up front so empty buckets still produce an output row.
#[derive(Debug, Default)]
pub struct BucketMap {
    buckets: Vec<TimeBucket>,
    index: HashMap<String, usize>,
}

impl BucketMap {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&TimeBucket> {
        self.index.get(key).map(|&i| &self.buckets[i])
    }

    fn push_key(&mut self, key: String) -> Result<(), ConfigError> {
        if self.index.contains_key(&key) {
            return Err(ConfigError::OverlappingRanges(key));
        }
        self.index.insert(key.clone(), self.buckets.len());
        self.buckets.push(TimeBucket {
            key,
            members: Vec::new(),
        });
        Ok(())
    }

    /// Appends `record` to the bucket at `key`.
    pub fn insert(&mut self, key: &str, record: NormalizedRecord) -> Result<(), RowError> {
        let &i = self
            .index
            .get(key)
            .ok_or_else(|| RowError::UnknownBucket(key.to_string()))?;
        self.buckets[i].members.push(record);
        Ok(())
    }
}

/// Emits `start, start + interval, ...` for each range while the key is
/// strictly before the range end.
pub fn generate_buckets(ranges: &[BucketRange]) -> Result<BucketMap, ConfigError> {
    let mut map = BucketMap::default();

    for range in ranges {
        let step = range.interval.duration();
        if step <= chrono::Duration::zero() {
            return Err(ConfigError::ZeroInterval);
        }
        let mut t = range.start;
        while t < range.end {
            map.push_key(t.format(DATETIME_FORMAT).to_string())?;
            t += step;
        }
    }

    Ok(map)
}

/// Floors the minute of day of `datetime` to a multiple of
/// `interval_minutes`, e.g. `12:47` becomes `12:40` for 10 minutes.
pub fn bucket_key_for(datetime: &str, interval_minutes: NonZeroU32) -> Result<String, RowError> {
    let parsed = NaiveDateTime::parse_from_str(datetime, DATETIME_FORMAT).map_err(|_| {
        RowError::Parse {
            field: "datetime",
            raw: datetime.to_string(),
        }
    })?;

    let step = interval_minutes.get();
    let minute_of_day = parsed.hour() * 60 + parsed.minute();
    let floored = minute_of_day / step * step;
    Ok(format!(
        "{} {:02}:{:02}:00",
        parsed.date().format("%Y-%m-%d"),
        floored / 60,
        floored % 60
    ))
}

/// Places each record into its bucket. Records whose key was never
/// generated are dropped and counted, not fatal.
pub fn assign(
    map: &mut BucketMap,
    records: impl IntoIterator<Item = NormalizedRecord>,
    interval_minutes: NonZeroU32,
    counts: &mut ErrorCounts,
) {
    for record in records {
        let placed = bucket_key_for(&record.datetime, interval_minutes)
            .and_then(|key| map.insert(&key, record));
        if let Err(err) = placed {
            log::warn!("dropping record: {}", err);
            counts.record(&err);
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightError {
    #[error("weights sum to zero")]
    ZeroWeight,
    #[error("weighted sum overflows")]
    Overflow,
}

/// `sum(x * w) / sum(w)`, accumulated exactly in 128 bits.
pub fn weighted_average(values: &[i64], weights: &[i64]) -> Result<f64, WeightError> {
    let mut total_weight: i128 = 0;
    let mut weighted: i128 = 0;
    for (&x, &w) in values.iter().zip(weights) {
        total_weight = total_weight
            .checked_add(i128::from(w))
            .ok_or(WeightError::Overflow)?;
        weighted = i128::from(x)
            .checked_mul(i128::from(w))
            .and_then(|xw| weighted.checked_add(xw))
            .ok_or(WeightError::Overflow)?;
    }
    if total_weight == 0 {
        return Err(WeightError::ZeroWeight);
    }
    Ok(weighted as f64 / total_weight as f64)
}

fn aggregate_bucket(bucket: TimeBucket) -> Result<AggregatedRow, (AggregatedRow, RowError)> {
    if bucket.members.is_empty() {
        return Ok(AggregatedRow {
            datetime: bucket.key,
            heartrate: None,
            duration: None,
        });
    }

    let (values, weights): (Vec<i64>, Vec<i64>) = bucket
        .members
        .iter()
        .map(|m| (m.measurement, m.duration))
        .unzip();
    let duration = weights.iter().try_fold(0i64, |acc, &w| acc.checked_add(w));

    match (weighted_average(&values, &weights), duration) {
        (Ok(avg), Some(duration)) => Ok(AggregatedRow {
            datetime: bucket.key,
            heartrate: Some(avg.round() as i64),
            duration: Some(duration),
        }),
        (Err(WeightError::ZeroWeight), Some(duration)) => {
            let err = RowError::DivisionByZero(bucket.key.clone());
            Err((
                AggregatedRow {
                    datetime: bucket.key,
                    heartrate: None,
                    duration: Some(duration),
                },
                err,
            ))
        }
        _ => {
            let err = RowError::Overflow(bucket.key.clone());
            Err((
                AggregatedRow {
                    datetime: bucket.key,
                    heartrate: None,
                    duration: None,
                },
                err,
            ))
        }
    }
}

/// Consumes the map, one row per bucket in generation order.
pub fn aggregate(map: BucketMap, counts: &mut ErrorCounts) -> Vec<AggregatedRow> {
    map.buckets
        .into_iter()
        .map(|bucket| match aggregate_bucket(bucket) {
            Ok(row) => row,
            Err((row, err)) => {
                log::warn!("{}; heartrate left empty", err);
                counts.record(&err);
                row
            }
        })
        .collect()
}
