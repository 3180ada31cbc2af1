use crate::config::FieldType;
use crate::error::{ErrorCounts, RowError};
use crate::normalize::NormalizedRow;
use crate::NormalizedRecord;
use std::collections::BTreeSet;

pub fn is_well_typed(row: &NormalizedRow, expected_types: &BTreeSet<FieldType>) -> bool {
    row.fields().iter().all(|field| {
        field
            .field_type()
            .map_or(false, |ty| expected_types.contains(&ty))
    })
}

/// Prefix match against the canonical datetime only.
pub fn is_in_months(record: &NormalizedRecord, month_prefixes: &BTreeSet<String>) -> bool {
    month_predicate(month_prefixes)(&record.datetime)
}

/// Folds the allowed prefixes into a single predicate. An empty set
/// matches nothing.
pub fn month_predicate<'a>(month_prefixes: &'a BTreeSet<String>) -> impl Fn(&str) -> bool + 'a {
    move |datetime: &str| {
        month_prefixes
            .iter()
            .fold(false, |keep, prefix| keep || datetime.starts_with(prefix.as_str()))
    }
}

/// Single pass over the normalized rows: type filter, then month filter.
/// Survivors keep their input order. An empty `month_prefixes` disables
/// the month filter.
pub fn filter_rows(
    rows: Vec<NormalizedRow>,
    expected_types: &BTreeSet<FieldType>,
    month_prefixes: &BTreeSet<String>,
    counts: &mut ErrorCounts,
) -> Vec<NormalizedRecord> {
    let in_months = month_predicate(month_prefixes);
    let mut kept = Vec::with_capacity(rows.len());

    for row in rows {
        if !is_well_typed(&row, expected_types) {
            let err = row.parse_error().cloned().unwrap_or(RowError::TypeMismatch);
            log::debug!("dropping row: {}", err);
            counts.record(&err);
            continue;
        }
        let record = match row.into_record() {
            Ok(record) => record,
            Err(err) => {
                counts.record(&err);
                continue;
            }
        };
        if !month_prefixes.is_empty() && !in_months(&record.datetime) {
            counts.outside_months += 1;
            continue;
        }
        kept.push(record);
    }

    kept
}
