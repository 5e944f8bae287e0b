//! Buienradar feed client
//!
//! Retrieves current station measurements from the Buienradar JSON feed
//! and converts them into per-station `Record`s.
//!
//! Feed: https://data.buienradar.nl/2.0/feed/json
//!
//! Measurement keys are kept under the feed's own names (`windspeed`,
//! `airpressure`, `feeltemperature`, ...), which are also the names used in
//! frame layouts. The feed marks unavailable measurements with `null`, an
//! empty string or `"-"`; all three become `Value::Missing`.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Map;

use crate::model::{
    Record, StationId, Value, WeatherError, FIELD_FEEL_TEMPERATURE, FIELD_HUMIDITY,
    FIELD_TEMPERATURE, FIELD_WIND_SPEED,
};
use crate::weather;

pub const BUIENRADAR_FEED_URL: &str = "https://data.buienradar.nl/2.0/feed/json";

/// Per-request timeout of the feed download.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Station number key inside each measurement object.
const STATION_ID_KEY: &str = "stationid";

/// Strings the feed uses for "no measurement".
const INVALID_TEXT: &[&str] = &["", "-"];

// ============================================================================
// Feed Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BuienradarFeed {
    pub actual: ActualWeather,
}

#[derive(Debug, Deserialize)]
pub struct ActualWeather {
    #[serde(default)]
    pub sunrise: Option<String>,
    #[serde(default)]
    pub sunset: Option<String>,
    pub stationmeasurements: Vec<Map<String, serde_json::Value>>,
}

// ============================================================================
// Client Functions
// ============================================================================

/// Builds the blocking HTTP client used for feed downloads.
pub fn build_client() -> Result<reqwest::blocking::Client, WeatherError> {
    reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| WeatherError::Network(e.to_string()))
}

/// Downloads the raw feed body. One attempt; retrying is up to the caller's
/// next collection cycle.
pub fn fetch_feed(client: &reqwest::blocking::Client, url: &str) -> Result<String, WeatherError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .map_err(|e| WeatherError::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(WeatherError::HttpError(response.status().as_u16()));
    }

    response
        .text()
        .map_err(|e| WeatherError::Network(e.to_string()))
}

/// Downloads and parses the feed in one go.
pub fn fetch_records(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<HashMap<StationId, Record>, WeatherError> {
    let body = fetch_feed(client, url)?;
    parse_feed(&body)
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a feed body into one record per station.
///
/// Measurement objects without a numeric `stationid` are skipped. When a
/// station reports a temperature but no apparent temperature, the apparent
/// temperature is derived from temperature, wind speed and humidity.
pub fn parse_feed(json: &str) -> Result<HashMap<StationId, Record>, WeatherError> {
    let feed: BuienradarFeed =
        serde_json::from_str(json).map_err(|e| WeatherError::ParseError(e.to_string()))?;

    let records = feed
        .actual
        .stationmeasurements
        .iter()
        .filter_map(|measurement| {
            let id = station_id(measurement)?;
            Some((id, parse_measurement(measurement)))
        })
        .collect();

    Ok(records)
}

fn station_id(measurement: &Map<String, serde_json::Value>) -> Option<StationId> {
    measurement
        .get(STATION_ID_KEY)
        .and_then(serde_json::Value::as_u64)
        .and_then(|id| StationId::try_from(id).ok())
}

fn parse_measurement(measurement: &Map<String, serde_json::Value>) -> Record {
    let mut record: Record = measurement
        .iter()
        .filter(|(key, _)| key.as_str() != STATION_ID_KEY)
        .map(|(key, value)| (key.clone(), convert_value(value)))
        .collect();

    if record.present(FIELD_FEEL_TEMPERATURE).is_none() {
        if let Some(feel) = weather::apparent_temperature(
            record.number(FIELD_WIND_SPEED),
            record.number(FIELD_TEMPERATURE),
            record.number(FIELD_HUMIDITY),
        ) {
            record.insert(FIELD_FEEL_TEMPERATURE, feel);
        }
    }

    record
}

/// Maps a JSON value onto a measurement. Nested objects and arrays carry
/// nothing the frame can use and are treated as missing.
pub fn convert_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Missing,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Missing),
        serde_json::Value::String(s) if INVALID_TEXT.contains(&s.trim()) => Value::Missing,
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Value::Missing,
    }
}

// ============================================================================
// Tests
// ============================================================================
