use crate::config::FieldType;
use crate::error::RowError;
use crate::{NormalizedRecord, RawRecord};
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use rayon::prelude::*;

/// Canonical record timestamp: local wall clock, seconds pinned to zero.
pub const CANONICAL_MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M:00";

// `%#z` takes +02, +0200 and +02:00. Seconds are optional.
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
}

/// Parses an absolute timestamp. A trailing `Z` and naive timestamps are
/// both read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Some(body) = trimmed.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        return parse_naive(body).map(|naive| naive.and_utc());
    }

    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(trimmed, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| parse_naive(trimmed).map(|naive| naive.and_utc()))
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Converts `raw` into `zone` and renders it at minute precision.
pub fn normalize_timestamp(raw: &str, zone: &Tz) -> Result<String, RowError> {
    let utc = parse_timestamp(raw).ok_or_else(|| RowError::Parse {
        field: "timestamp",
        raw: raw.to_string(),
    })?;
    Ok(utc
        .with_timezone(zone)
        .format(CANONICAL_MINUTE_FORMAT)
        .to_string())
}

/// Reduces `86`, `[86]` or `[86, 90 92]` to one integer. `Mean` truncates
/// toward zero.
pub fn normalize_numeric_list(raw: &str, reducer: Reducer) -> Result<i64, RowError> {
    parse_numeric_list(raw, reducer, "numeric list")
}

fn parse_numeric_list(
    raw: &str,
    reducer: Reducer,
    field: &'static str,
) -> Result<i64, RowError> {
    let values = parse_values(raw, field)?;
    reduce_values(&values, reducer).ok_or_else(|| parse_error(raw, field))
}

/// Durations weight the bucket average, so a negative one is malformed.
fn parse_duration_list(raw: &str) -> Result<i64, RowError> {
    let values = parse_values(raw, "duration")?;
    if values.iter().any(|v| *v < 0) {
        return Err(parse_error(raw, "duration"));
    }
    reduce_values(&values, Reducer::Sum).ok_or_else(|| parse_error(raw, "duration"))
}

fn parse_error(raw: &str, field: &'static str) -> RowError {
    RowError::Parse {
        field,
        raw: raw.to_string(),
    }
}

fn parse_values(raw: &str, field: &'static str) -> Result<Vec<i64>, RowError> {
    let values = raw
        .split(|c: char| c == '[' || c == ']' || c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<i64>())
        .collect::<Result<Vec<i64>, _>>()
        .map_err(|_| parse_error(raw, field))?;

    if values.is_empty() {
        return Err(parse_error(raw, field));
    }
    Ok(values)
}

/// `None` if the sum overflows.
fn reduce_values(values: &[i64], reducer: Reducer) -> Option<i64> {
    let total = values
        .iter()
        .try_fold(0i64, |acc, v| acc.checked_add(*v))?;

    Some(match reducer {
        Reducer::Sum => total,
        Reducer::Mean => total / values.len() as i64,
    })
}

/// A normalized cell. Failures are kept in place as `Unparsed` so the
/// validator can filter them out instead of the normalizer raising.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Int(i64),
    Text(String),
    Unparsed { raw: String, error: RowError },
}

impl Field {
    fn from_result<T>(result: Result<T, RowError>, raw: &str) -> Field
    where
        T: Into<Field>,
    {
        match result {
            Ok(value) => value.into(),
            Err(error) => Field::Unparsed {
                raw: raw.to_string(),
                error,
            },
        }
    }

    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Field::Int(_) => Some(FieldType::Int),
            Field::Text(_) => Some(FieldType::Text),
            Field::Unparsed { .. } => None,
        }
    }
}

impl From<i64> for Field {
    fn from(v: i64) -> Self {
        Field::Int(v)
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub datetime: Field,
    pub measurement: Field,
    pub duration: Field,
}

impl NormalizedRow {
    pub fn fields(&self) -> [&Field; 3] {
        [&self.datetime, &self.measurement, &self.duration]
    }

    /// First normalization failure in column order, if any.
    pub fn parse_error(&self) -> Option<&RowError> {
        self.fields().into_iter().find_map(|field| match field {
            Field::Unparsed { error, .. } => Some(error),
            _ => None,
        })
    }

    /// Converts a well-typed row into a record.
    pub fn into_record(self) -> Result<NormalizedRecord, RowError> {
        match self {
            NormalizedRow {
                datetime: Field::Text(datetime),
                measurement: Field::Int(measurement),
                duration: Field::Int(duration),
            } => Ok(NormalizedRecord {
                datetime,
                measurement,
                duration,
            }),
            row => Err(row.parse_error().cloned().unwrap_or(RowError::TypeMismatch)),
        }
    }
}

pub fn normalize_row(raw: &RawRecord, zone: &Tz) -> NormalizedRow {
    NormalizedRow {
        datetime: Field::from_result(normalize_timestamp(&raw.start, zone), &raw.start),
        measurement: Field::from_result(
            parse_numeric_list(&raw.value, Reducer::Mean, "value"),
            &raw.value,
        ),
        duration: Field::from_result(parse_duration_list(&raw.duration), &raw.duration),
    }
}

/// Normalizes every row in parallel; output order matches input order.
pub fn normalize_rows(raws: &[RawRecord], zone: &Tz) -> Vec<NormalizedRow> {
    raws.par_iter().map(|raw| normalize_row(raw, zone)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_truncates_toward_zero() {
        assert_eq!(normalize_numeric_list("[86,87]", Reducer::Mean), Ok(86));
        assert_eq!(normalize_numeric_list("[-3,-4]", Reducer::Mean), Ok(-3));
    }

    #[test]
    fn sum_accepts_mixed_separators() {
        assert_eq!(normalize_numeric_list("[1, 2 3]", Reducer::Sum), Ok(6));
        assert_eq!(normalize_numeric_list("22", Reducer::Sum), Ok(22));
    }

    #[test]
    fn empty_and_garbage_lists_fail() {
        assert!(normalize_numeric_list("[]", Reducer::Mean).is_err());
        assert!(normalize_numeric_list("[8a]", Reducer::Sum).is_err());
        assert!(normalize_numeric_list("", Reducer::Sum).is_err());
    }

    #[test]
    fn zulu_and_offset_agree() {
        let a = parse_timestamp("2022-04-11T00:07:40Z").unwrap();
        let b = parse_timestamp("2022-04-11T02:07:40+02:00").unwrap();
        let c = parse_timestamp("2022-04-11 00:07:40+00:00").unwrap();
        let d = parse_timestamp("2022-04-11T02:07:40+02").unwrap();
        let e = parse_timestamp("2022-04-11T02:07:40+0200").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
        assert_eq!(a, e);
    }

    #[test]
    fn minute_precision_stamps_parse() {
        let zulu = parse_timestamp("2022-04-11T00:07Z").unwrap();
        let offset = parse_timestamp("2022-04-11 02:07+02:00").unwrap();
        assert_eq!(zulu, offset);
        assert_eq!(zulu, parse_timestamp("2022-04-11T00:07:00Z").unwrap());
    }

    #[test]
    fn negative_duration_is_rejected() {
        assert!(parse_duration_list("[10,-5]").is_err());
        assert_eq!(parse_duration_list("[10, 5]"), Ok(15));
    }

    #[test]
    fn failed_field_becomes_unparsed() {
        let raw = RawRecord {
            start: "not a date".to_string(),
            value: "[80]".to_string(),
            duration: "[5]".to_string(),
        };
        let row = normalize_row(&raw, &chrono_tz::UTC);
        assert_eq!(row.datetime.field_type(), None);
        assert_eq!(row.measurement, Field::Int(80));
        assert!(matches!(
            row.into_record(),
            Err(RowError::Parse {
                field: "timestamp",
                ..
            })
        ));
    }
}
