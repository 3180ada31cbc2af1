use std::fmt;
use thiserror::Error;

/// Problems that drop a single row (or null a single bucket) without
/// stopping the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("failed to parse {field}: {raw:?}")]
    Parse { field: &'static str, raw: String },
    #[error("row has a field outside the expected types")]
    TypeMismatch,
    #[error("no bucket for key {0}")]
    UnknownBucket(String),
    #[error("bucket {0} has zero total duration")]
    DivisionByZero(String),
    #[error("bucket {0} sums overflow")]
    Overflow(String),
}

impl RowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RowError::Parse { .. } => ErrorKind::Parse,
            RowError::TypeMismatch => ErrorKind::TypeMismatch,
            RowError::UnknownBucket(_) => ErrorKind::UnknownBucket,
            RowError::DivisionByZero(_) => ErrorKind::DivisionByZero,
            RowError::Overflow(_) => ErrorKind::Overflow,
        }
    }
}

/// Fatal configuration problems, raised before any row is processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid date {0:?} (expected YYYY-MM-DD HH:MM:SS)")]
    InvalidDate(String),
    #[error("date range ends before it starts: {start} .. {end}")]
    NonMonotonicRange { start: String, end: String },
    #[error("bucket interval must be positive")]
    ZeroInterval,
    #[error("bucket interval of {0} minutes does not divide a day evenly")]
    IntervalNotDayAligned(u32),
    #[error("range start {start} is not on a {minutes}-minute boundary")]
    MisalignedRangeStart { start: String, minutes: u32 },
    #[error("date ranges overlap at {0}")]
    OverlappingRanges(String),
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    TypeMismatch,
    UnknownBucket,
    DivisionByZero,
    Overflow,
}

/// Per-kind tally of everything the pipeline dropped along the way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounts {
    pub parse: usize,
    pub type_mismatch: usize,
    pub unknown_bucket: usize,
    pub zero_weight_buckets: usize,
    pub overflowed_buckets: usize,
    pub outside_months: usize,
}

impl ErrorCounts {
    pub fn record(&mut self, err: &RowError) {
        match err.kind() {
            ErrorKind::Parse => self.parse += 1,
            ErrorKind::TypeMismatch => self.type_mismatch += 1,
            ErrorKind::UnknownBucket => self.unknown_bucket += 1,
            ErrorKind::DivisionByZero => self.zero_weight_buckets += 1,
            ErrorKind::Overflow => self.overflowed_buckets += 1,
        }
    }

    /// Rows that never reached a bucket.
    pub fn dropped_rows(&self) -> usize {
        self.parse + self.type_mismatch + self.unknown_bucket + self.outside_months
    }

    pub fn log_summary(&self) {
        log::info!("{}", self);
        if self.unknown_bucket > 0 {
            log::warn!(
                "{} rows fell outside every generated bucket",
                self.unknown_bucket
            );
        }
    }
}

impl fmt::Display for ErrorCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dropped rows: {} unparsable, {} mistyped, {} outside months, {} without bucket; {} buckets with zero duration, {} overflowed",
            self.parse,
            self.type_mismatch,
            self.outside_months,
            self.unknown_bucket,
            self.zero_weight_buckets,
            self.overflowed_buckets
        )
    }
}
