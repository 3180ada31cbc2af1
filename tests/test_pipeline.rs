use hr_cleaner::config::{DateRange, PipelineConfig};
use hr_cleaner::error::ConfigError;
use hr_cleaner::pipeline::run;
use hr_cleaner::RawRecord;

fn utc_config(ranges: Vec<DateRange>) -> PipelineConfig {
    PipelineConfig {
        target_timezone: "UTC".to_string(),
        date_ranges: ranges,
        month_filter: ["2022-04-".to_string()].into_iter().collect(),
        ..PipelineConfig::default()
    }
}

fn one_hour() -> Vec<DateRange> {
    vec![DateRange::new("2022-04-11 00:00:00", "2022-04-11 01:00:00")]
}

#[test]
fn two_samples_share_a_ten_minute_bucket() {
    let raw = vec![
        RawRecord::new("2022-04-11T00:07:40Z", "[86]", "[22]"),
        RawRecord::new("2022-04-11T00:09:24Z", "[90]", "[18]"),
    ];
    let out = run(&raw, &utc_config(one_hour())).unwrap();

    assert_eq!(out.rows.len(), 6);
    assert_eq!(out.rows[0].datetime, "2022-04-11 00:00:00");
    assert_eq!(out.rows[0].heartrate, Some(88));
    assert_eq!(out.rows[0].duration, Some(40));
    for row in &out.rows[1..] {
        assert_eq!(row.heartrate, None);
        assert_eq!(row.duration, None);
    }
    assert_eq!(out.counts.dropped_rows(), 0);
}

#[test]
fn empty_value_list_is_dropped_without_failing_the_run() {
    let raw = vec![
        RawRecord::new("2022-04-11T00:07:40Z", "[]", "[22]"),
        RawRecord::new("2022-04-11T00:09:24Z", "[90]", "[18]"),
    ];
    let out = run(&raw, &utc_config(one_hour())).unwrap();

    assert_eq!(out.counts.parse, 1);
    assert_eq!(out.rows[0].heartrate, Some(90));
    assert_eq!(out.rows[0].duration, Some(18));
}

#[test]
fn row_outside_month_filter_never_reaches_a_bucket() {
    let ranges = vec![
        DateRange::new("2022-03-15 10:00:00", "2022-03-15 10:10:00"),
        DateRange::new("2022-04-11 00:00:00", "2022-04-11 00:10:00"),
    ];
    let raw = vec![
        RawRecord::new("2022-03-15T10:00:00Z", "[70]", "[10]"),
        RawRecord::new("2022-04-11T00:01:00Z", "[80]", "[10]"),
    ];
    let out = run(&raw, &utc_config(ranges)).unwrap();

    assert_eq!(out.counts.outside_months, 1);
    assert_eq!(out.rows[0].heartrate, None);
    assert_eq!(out.rows[1].heartrate, Some(80));
}

#[test]
fn empty_range_produces_no_rows() {
    let ranges = vec![DateRange::new("2022-04-11 00:00:00", "2022-04-11 00:00:00")];
    let raw = vec![RawRecord::new("2022-04-11T00:07:40Z", "[86]", "[22]")];
    let out = run(&raw, &utc_config(ranges)).unwrap();

    assert!(out.rows.is_empty());
    assert_eq!(out.counts.unknown_bucket, 1);
}

#[test]
fn unsorted_input_lands_in_chronological_buckets() {
    let raw = vec![
        RawRecord::new("2022-04-11T00:45:00Z", "[100]", "[5]"),
        RawRecord::new("2022-04-11T00:02:00Z", "[60]", "[5]"),
        RawRecord::new("2022-04-11T00:21:00Z", "[80]", "[5]"),
    ];
    let out = run(&raw, &utc_config(one_hour())).unwrap();
    let rates: Vec<Option<i64>> = out.rows.iter().map(|r| r.heartrate).collect();
    assert_eq!(
        rates,
        vec![Some(60), None, Some(80), None, Some(100), None]
    );
}

#[test]
fn timestamps_are_bucketed_in_the_target_zone() {
    let config = PipelineConfig {
        target_timezone: "US/Pacific".to_string(),
        date_ranges: vec![DateRange::new("2022-04-10 17:00:00", "2022-04-10 18:00:00")],
        ..PipelineConfig::default()
    };
    let raw = vec![RawRecord::new("2022-04-11T00:07:40Z", "[86]", "[22]")];
    let out = run(&raw, &config).unwrap();

    assert_eq!(out.rows[0].datetime, "2022-04-10 17:00:00");
    assert_eq!(out.rows[0].heartrate, Some(86));
}

#[test]
fn bad_config_fails_before_processing() {
    let mut config = utc_config(one_hour());
    config.bucket_interval.value = 0;
    let raw = vec![RawRecord::new("2022-04-11T00:07:40Z", "[86]", "[22]")];
    assert_eq!(run(&raw, &config).unwrap_err(), ConfigError::ZeroInterval);

    let mut config = utc_config(one_hour());
    config.date_ranges = vec![DateRange::new("April", "May")];
    assert_eq!(
        run(&raw, &config).unwrap_err(),
        ConfigError::InvalidDate("April".to_string())
    );
}

#[test]
fn huge_durations_do_not_abort_the_run() {
    let raw = vec![
        RawRecord::new("2022-04-11T00:01:00Z", "[80]", "[9223372036854775807]"),
        RawRecord::new("2022-04-11T00:02:00Z", "[90]", "[9223372036854775807]"),
        RawRecord::new("2022-04-11T00:15:00Z", "[70]", "[10]"),
    ];
    let out = run(&raw, &utc_config(one_hour())).unwrap();

    assert_eq!(out.rows.len(), 6);
    assert_eq!(out.rows[0].heartrate, None);
    assert_eq!(out.rows[0].duration, None);
    assert_eq!(out.rows[1].heartrate, Some(70));
    assert_eq!(out.counts.overflowed_buckets, 1);
}

#[test]
fn negative_duration_row_is_dropped() {
    let raw = vec![
        RawRecord::new("2022-04-11T00:01:00Z", "[80]", "[10]"),
        RawRecord::new("2022-04-11T00:02:00Z", "[90]", "[-5]"),
    ];
    let out = run(&raw, &utc_config(one_hour())).unwrap();

    assert_eq!(out.counts.parse, 1);
    assert_eq!(out.rows[0].heartrate, Some(80));
    assert_eq!(out.rows[0].duration, Some(10));
}

#[test]
fn fall_back_hour_folds_into_the_same_buckets() {
    // 2021-11-07 01:30 happens twice in US/Pacific: 08:30Z (PDT) and 09:30Z (PST)
    let config = PipelineConfig {
        target_timezone: "US/Pacific".to_string(),
        date_ranges: vec![DateRange::new("2021-11-07 01:00:00", "2021-11-07 02:00:00")],
        ..PipelineConfig::default()
    };
    let raw = vec![
        RawRecord::new("2021-11-07T08:31:00Z", "[80]", "[10]"),
        RawRecord::new("2021-11-07T09:32:00Z", "[100]", "[10]"),
    ];
    let out = run(&raw, &config).unwrap();

    assert_eq!(out.rows.len(), 6);
    assert_eq!(out.rows[3].datetime, "2021-11-07 01:30:00");
    assert_eq!(out.rows[3].heartrate, Some(90));
    assert_eq!(out.rows[3].duration, Some(20));
    assert_eq!(out.counts.dropped_rows(), 0);
}
