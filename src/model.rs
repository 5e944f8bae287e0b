//! Core data types for the weathervane service.
//!
//! This module defines the shared domain model imported by all other modules:
//! measurement values, per-station records, station identifiers, the reserved
//! field names that the rest of the crate dispatches on, and the crate error.
//! It contains no logic beyond small accessors, no I/O, and no external
//! dependencies.

use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Reserved field names
// ---------------------------------------------------------------------------

/// Compass code of the wind direction ("N", "NNO", ... "NNW").
pub const FIELD_WIND_DIRECTION: &str = "winddirection";

/// Mean wind speed. Never encoded above `FIELD_WIND_GUSTS`.
pub const FIELD_WIND_SPEED: &str = "windspeed";

/// Maximum wind speed (gusts). Ceiling for `FIELD_WIND_SPEED`.
pub const FIELD_WIND_GUSTS: &str = "windgusts";

/// Precipitation intensity; transmitted as a single "it rains" bit.
pub const FIELD_PRECIPITATION: &str = "precipitation";

/// Random filler used by the display link for framing diagnostics.
pub const FIELD_RANDOM: &str = "random";

/// Air pressure, the input of the barometric trend.
pub const FIELD_AIR_PRESSURE: &str = "airpressure";

/// Apparent ("feels like") temperature.
pub const FIELD_FEEL_TEMPERATURE: &str = "feeltemperature";

pub const FIELD_TEMPERATURE: &str = "temperature";
pub const FIELD_HUMIDITY: &str = "humidity";
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// Synthetic flag: reading unusable (missing required data or stale).
pub const FIELD_ERROR: &str = "error";

/// Synthetic flag: at least one field came from a fallback station.
pub const FIELD_DATA_FROM_FALLBACK: &str = "data_from_fallback";

/// Synthetic categorical code, see `trend::BarometricTrend`.
pub const FIELD_BAROMETRIC_TREND: &str = "barometric_trend";

/// Padding slot in the frame layout.
pub const FIELD_DUMMY_BYTE: &str = "DUMMY_BYTE";

/// Field names that are produced by this crate rather than by a station.
/// The reconciler never looks these up on fallback stations.
pub const SYNTHETIC_FIELDS: &[&str] = &[
    FIELD_ERROR,
    FIELD_DUMMY_BYTE,
    FIELD_BAROMETRIC_TREND,
    FIELD_DATA_FROM_FALLBACK,
    FIELD_RANDOM,
];

// ---------------------------------------------------------------------------
// Measurement values
// ---------------------------------------------------------------------------

/// A single measurement as reported by a station.
///
/// `Missing` is an explicit value: a record that carries `Missing` for a
/// field asked for it and got nothing back, which the reconciler treats
/// exactly like a field that is not in the record at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view used by the encoder. Booleans count as 1/0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Missing | Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Missing)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Buienradar station number, e.g. 6275 for Arnhem.
pub type StationId = u32;

/// All measurements of one station for one fetch cycle, keyed by field name.
///
/// Also used for the authoritative reading produced by the reconciler,
/// which additionally carries the `error` and `data_from_fallback` flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value, or `None` if the field is not in the record.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the value unless it is absent (not stored, or `Missing`).
    pub fn present(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_missing())
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_number)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    /// Reads a boolean flag; anything other than `Bool(true)` is false.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style insert, mostly for tests and fixtures.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised outside the core merge/annotate/encode path: feed access,
/// configuration, layout validation and frame delivery.
#[derive(Debug, PartialEq)]
pub enum WeatherError {
    /// Non-2xx HTTP response from the weather feed.
    HttpError(u16),
    /// The feed could not be reached at all (DNS, connect, timeout).
    Network(String),
    /// The feed body could not be deserialized or has an unexpected shape.
    ParseError(String),
    /// The configuration file is unreadable or malformed.
    ConfigError(String),
    /// A frame layout entry can never be encoded correctly.
    InvalidLayout { field: String, reason: String },
    /// The frame sink rejected a frame.
    Transport(String),
}

impl std::fmt::Display for WeatherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherError::HttpError(code) => write!(f, "HTTP error: {}", code),
            WeatherError::Network(msg) => write!(f, "Network error: {}", msg),
            WeatherError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            WeatherError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            WeatherError::InvalidLayout { field, reason } => {
                write!(f, "Invalid layout for field {}: {}", field, reason)
            }
            WeatherError::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for WeatherError {}
