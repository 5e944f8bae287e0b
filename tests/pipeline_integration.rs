//! End-to-end tests: recorded Buienradar feed → merge → annotate → frame.
//!
//! The fixture in `tests/fixtures/buienradar.json` is a trimmed copy of a
//! real feed response. Arnhem (6275) reports no visibility; De Bilt (6260)
//! does. Both report the offset-less local timestamps the live feed uses, so
//! every test derives its clock from the fixture instead of hard-coding UTC.
//!
//! Run with: cargo test --test pipeline_integration

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use weathervane::annotate::parse_timestamp;
use weathervane::bitio::BitReader;
use weathervane::config::Config;
use weathervane::ingest::buienradar::parse_feed;
use weathervane::model::{Record, StationId};
use weathervane::pipeline::Pipeline;
use weathervane::transport::{FrameSink, MemorySink};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const FEED: &str = include_str!("fixtures/buienradar.json");

const CONFIG: &str = r#"
stations = [6275, 6260]

[[bits]]
key = "winddirection"
length = 4

[[bits]]
key = "windspeed"
length = 6
min = 0
max = 63
step = 1

[[bits]]
key = "windgusts"
length = 6
min = 0
max = 63
step = 1

[[bits]]
key = "visibility"
length = 8
min = 0
max = 25500
step = 100

[[bits]]
key = "precipitation"
length = 1

[[bits]]
key = "temperature"
length = 10
min = -39.9
max = 49.9
step = 0.1

[[bits]]
key = "data_from_fallback"
length = 1

[[bits]]
key = "error"
length = 1
"#;

fn records() -> HashMap<StationId, Record> {
    parse_feed(FEED).expect("fixture should parse")
}

/// Ten minutes after the fixture's measurement time.
fn fresh_now() -> DateTime<Utc> {
    parse_timestamp("2024-05-01T14:50:00").expect("fixture timestamp") + Duration::minutes(10)
}

fn config() -> Config {
    Config::from_toml_str(CONFIG).expect("test config should load")
}

/// Splits a frame back into its per-field codes.
fn decode(frame: &[u8], config: &Config) -> Vec<u32> {
    let mut reader = BitReader::new(frame);
    config
        .layout
        .fields()
        .iter()
        .map(|f| reader.read_bits(f.bit_width).expect("frame holds every field"))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_fixture_yields_two_stations() {
    let records = records();
    assert_eq!(records.len(), 2);
    assert!(records.contains_key(&6275));
    assert!(records.contains_key(&6260));
}

#[test]
fn test_full_cycle_fills_visibility_from_fallback() {
    let config = config();
    let mut pipeline = Pipeline::from_config(&config);
    let mut rng = StdRng::seed_from_u64(7);

    let out = pipeline.run_cycle_with_rng(&records(), fresh_now(), &mut rng);

    assert_eq!(out.reading.number("visibility"), Some(12000.0));
    assert_eq!(out.reading.number("temperature"), Some(18.4));
    assert!(out.reading.flag("data_from_fallback"));
    assert!(!out.reading.flag("error"));
    assert_eq!(out.frame.len(), config.layout.frame_len());
    assert_eq!(out.frame.len(), 5);

    // winddirection ZW, windspeed capped at the gusts, gusts, visibility,
    // no rain, 18.4 °C, fallback used, no error
    assert_eq!(decode(&out.frame, &config), vec![10, 3, 3, 120, 0, 583, 1, 0]);
}

#[test]
fn test_missing_primary_promotes_first_fallback() {
    let mut config = config();
    config.stations = vec![6290, 6260];
    let mut pipeline = Pipeline::from_config(&config);

    let out = pipeline.run_cycle(&records(), fresh_now());

    assert_eq!(out.reading.text("stationname"), Some("Meetstation De Bilt"));
    assert!(out.reading.flag("data_from_fallback"));
    assert!(!out.reading.flag("error"));
    let codes = decode(&out.frame, &config);
    assert_eq!(codes[0], 11); // WZW
    assert_eq!(codes[4], 1); // 0.3 mm/h counts as rain
}

#[test]
fn test_stale_feed_sets_error_bit() {
    let config = config();
    let mut pipeline = Pipeline::from_config(&config);
    let now = fresh_now() + Duration::hours(3);

    let out = pipeline.run_cycle(&records(), now);

    assert!(out.reading.flag("error"));
    assert_eq!(*decode(&out.frame, &config).last().expect("error field"), 1);
}

#[test]
fn test_failed_download_sends_error_frame() {
    let config = config();
    let mut pipeline = Pipeline::from_config(&config);

    // The service substitutes an empty record set when the download fails.
    let out = pipeline.run_cycle(&HashMap::new(), fresh_now());

    assert!(out.reading.flag("error"));
    let codes = decode(&out.frame, &config);
    assert_eq!(codes[7], 1);
    assert_eq!(codes[5], 399); // temperature absent, encoded as 0 °C
}

#[test]
fn test_repeated_cycle_is_unchanged_and_delivered() {
    let config = config();
    let mut pipeline = Pipeline::from_config(&config);
    let mut sink = MemorySink::default();
    let records = records();

    for _ in 0..2 {
        let out = pipeline.run_cycle(&records, fresh_now());
        sink.send(&out.frame).expect("memory sink never fails");
    }
    let third = pipeline.run_cycle(&records, fresh_now() + Duration::hours(3));

    assert_eq!(sink.frames.len(), 2);
    assert_eq!(sink.frames[0], sink.frames[1]);
    assert!(third.changed);
}

#[test]
fn test_bundled_config_loads() {
    let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/weathervane.toml")).expect("bundled config should load");
    assert_eq!(config.stations, vec![6275, 6260, 6269]);
    assert!(config.general.barometric_trend);
    assert_eq!(config.layout.total_bits(), 64);

    let mut pipeline = Pipeline::from_config(&config);
    let out = pipeline.run_cycle(&records(), fresh_now());
    assert_eq!(out.frame.len(), 8);
}
