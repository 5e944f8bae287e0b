//! Station reconciliation: one authoritative reading from several stations.
//!
//! The first station in the configured list is the primary. Whenever the
//! primary lacks a field the frame needs, the fallback stations are asked in
//! priority order and the first one that has a value wins. There is no
//! averaging or interpolation between stations.
//!
//! The input records are never modified; the merged reading is built as a
//! fresh `Record` carrying two extra flags:
//! - `data_from_fallback`: some value came from a station other than the one
//!   used as primary (or the primary was absent altogether)
//! - `error`: some required field could not be found on any station

use std::collections::HashMap;

use crate::catalog::FieldDescriptor;
use crate::model::{Record, StationId, FIELD_DATA_FROM_FALLBACK, FIELD_ERROR};

/// Merges per-station records into one authoritative reading.
///
/// - If `stations[0]` has no record, `stations[1]` is used as primary and the
///   reading is marked as coming from a fallback.
/// - With a single configured station, its record is returned as-is (plus
///   the two flags): single-station mode never reports missing fields.
/// - Otherwise every required field must be found on the primary or on a
///   later station, even when the promoted primary is the last one left.
/// - If no usable primary exists at all, the reading is empty and `error`.
///
/// Pure: takes no locks and does no logging. `Pipeline::run_cycle` reports
/// the outcome.
pub fn merge(
    records: &HashMap<StationId, Record>,
    stations: &[StationId],
    required_fields: &[FieldDescriptor],
) -> Record {
    let primary_index = match stations.first() {
        Some(id) if records.contains_key(id) => Some(0),
        Some(_) => stations.get(1).filter(|id| records.contains_key(*id)).map(|_| 1),
        None => None,
    };
    let mut data_from_fallback = matches!(stations.first(), Some(id) if !records.contains_key(id));

    let Some(primary_index) = primary_index else {
        return Record::new()
            .with(FIELD_DATA_FROM_FALLBACK, data_from_fallback)
            .with(FIELD_ERROR, true);
    };

    let mut result = records[&stations[primary_index]].clone();
    let mut error = false;

    if stations.len() > 1 {
        let fallbacks = &stations[primary_index + 1..];
        for field in required_fields.iter().filter(|f| !f.is_synthetic()) {
            if result.present(&field.name).is_some() {
                continue;
            }

            let found = fallbacks
                .iter()
                .find_map(|id| records.get(id).and_then(|r| r.present(&field.name)))
                .cloned();

            match found {
                Some(value) => {
                    result.insert(field.name.clone(), value);
                    data_from_fallback = true;
                }
                None => error = true,
            }
        }
    }

    result.insert(FIELD_DATA_FROM_FALLBACK, data_from_fallback);
    result.insert(FIELD_ERROR, error);
    result
}

/// Required fields that no station in `stations` reports. Used to explain
/// an `error` flag in the logs.
pub fn unresolved_fields<'a>(
    records: &HashMap<StationId, Record>,
    stations: &[StationId],
    required_fields: &'a [FieldDescriptor],
) -> Vec<&'a str> {
    required_fields
        .iter()
        .filter(|f| !f.is_synthetic())
        .filter(|f| {
            !stations
                .iter()
                .any(|id| records.get(id).is_some_and(|r| r.present(&f.name).is_some()))
        })
        .map(|f| f.name.as_str())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    fn fields(names: &[&str]) -> Vec<FieldDescriptor> {
        names.iter().map(|n| FieldDescriptor::new(*n, 8)).collect()
    }

    fn records(entries: Vec<(StationId, Record)>) -> HashMap<StationId, Record> {
        entries.into_iter().collect()
    }

    #[test]
    fn test_merge_with_fallback() {
        let data = records(vec![
            (1, Record::new().with("airpressure", Value::Missing)),
            (2, Record::new().with("airpressure", 1001.0)),
        ]);
        let merged = merge(&data, &[1, 2], &fields(&["airpressure"]));
        let expected = Record::new()
            .with("airpressure", 1001.0)
            .with("data_from_fallback", true)
            .with("error", false);
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_merge_prefers_primary_when_present() {
        let data = records(vec![
            (1, Record::new().with("airpressure", 1000.0)),
            (2, Record::new().with("airpressure", 1001.0)),
        ]);
        let merged = merge(&data, &[1, 2], &fields(&["airpressure"]));
        assert_eq!(merged.number("airpressure"), Some(1000.0));
        assert!(!merged.flag("data_from_fallback"));
        assert!(!merged.flag("error"));
    }

    #[test]
    fn test_single_station_returns_primary_even_when_incomplete() {
        let data = records(vec![
            (1, Record::new().with("airpressure", Value::Missing)),
            (2, Record::new().with("airpressure", 1001.0)),
        ]);
        let merged = merge(&data, &[1], &fields(&["airpressure"]));
        let expected = Record::new()
            .with("airpressure", Value::Missing)
            .with("data_from_fallback", false)
            .with("error", false);
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_fallbacks_are_searched_in_priority_order() {
        let data = records(vec![
            (10, Record::new().with("visibility", Value::Missing)),
            (20, Record::new()),
            (30, Record::new().with("visibility", 18100.0)),
            (40, Record::new().with("visibility", 5000.0)),
        ]);
        let merged = merge(&data, &[10, 20, 30, 40], &fields(&["visibility"]));
        assert_eq!(merged.number("visibility"), Some(18100.0));
        assert!(merged.flag("data_from_fallback"));
        assert!(!merged.flag("error"));
    }

    #[test]
    fn test_unresolvable_field_sets_error_but_keeps_others() {
        let data = records(vec![
            (1, Record::new().with("temperature", Value::Missing).with("humidity", Value::Missing)),
            (2, Record::new().with("humidity", 73.0)),
        ]);
        let merged = merge(&data, &[1, 2], &fields(&["temperature", "humidity"]));
        assert!(merged.flag("error"));
        assert!(merged.flag("data_from_fallback"));
        assert_eq!(merged.number("humidity"), Some(73.0));
        assert!(merged.present("temperature").is_none());
    }

    #[test]
    fn test_synthetic_fields_are_never_looked_up() {
        let data = records(vec![
            (1, Record::new().with("temperature", 12.0)),
            (2, Record::new().with("random", 3.0).with("barometric_trend", 1.0)),
        ]);
        let required = fields(&[
            "temperature", "error", "random", "barometric_trend", "data_from_fallback", "DUMMY_BYTE",
        ]);
        let merged = merge(&data, &[1, 2], &required);
        assert!(!merged.flag("error"));
        assert!(!merged.flag("data_from_fallback"));
        assert!(merged.get("random").is_none());
        assert!(merged.get("barometric_trend").is_none());
    }

    #[test]
    fn test_missing_primary_promotes_first_fallback() {
        let data = records(vec![
            (2, Record::new().with("temperature", Value::Missing)),
            (3, Record::new().with("temperature", 14.5)),
        ]);
        let merged = merge(&data, &[1, 2, 3], &fields(&["temperature"]));
        assert_eq!(merged.number("temperature"), Some(14.5));
        assert!(merged.flag("data_from_fallback"));
        assert!(!merged.flag("error"));
    }

    #[test]
    fn test_missing_primary_without_further_fallbacks() {
        let data = records(vec![(2, Record::new().with("temperature", Value::Missing))]);
        let merged = merge(&data, &[1, 2], &fields(&["temperature"]));
        assert!(merged.flag("data_from_fallback"));
        assert!(merged.flag("error"), "no station reports temperature");
        assert!(merged.present("temperature").is_none());
    }

    #[test]
    fn test_promoted_last_station_with_complete_record() {
        let data = records(vec![(2, Record::new().with("temperature", 9.5))]);
        let merged = merge(&data, &[1, 2], &fields(&["temperature"]));
        assert_eq!(merged.number("temperature"), Some(9.5));
        assert!(merged.flag("data_from_fallback"));
        assert!(!merged.flag("error"));
    }

    #[test]
    fn test_unresolved_fields_names_what_no_station_has() {
        let data = records(vec![
            (1, Record::new().with("temperature", Value::Missing).with("humidity", 60.0)),
            (2, Record::new().with("airpressure", 1010.0)),
        ]);
        let required = fields(&["temperature", "humidity", "airpressure", "error"]);
        assert_eq!(unresolved_fields(&data, &[1, 2], &required), vec!["temperature"]);
    }

    #[test]
    fn test_no_usable_station_is_an_error() {
        let data = records(vec![(9, Record::new().with("temperature", 14.5))]);
        let merged = merge(&data, &[1, 2], &fields(&["temperature"]));
        assert!(merged.flag("error"));
        assert!(merged.present("temperature").is_none());

        let merged = merge(&data, &[], &fields(&["temperature"]));
        assert!(merged.flag("error"));
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let data = records(vec![
            (1, Record::new().with("temperature", Value::Missing)),
            (2, Record::new().with("temperature", 18.4)),
        ]);
        let before = data.clone();
        let _ = merge(&data, &[1, 2], &fields(&["temperature"]));
        assert_eq!(data, before);
    }

    #[test]
    fn test_end_to_end_example() {
        let data = records(vec![
            (1, Record::new().with("temperature", Value::Missing).with("pressure", 1013.0)),
            (2, Record::new().with("temperature", 18.4).with("pressure", 1000.0)),
        ]);
        let merged = merge(&data, &[1, 2], &fields(&["temperature", "pressure"]));
        let expected = Record::new()
            .with("temperature", 18.4)
            .with("pressure", 1013.0)
            .with("data_from_fallback", true)
            .with("error", false);
        assert_eq!(merged, expected);
    }
}
