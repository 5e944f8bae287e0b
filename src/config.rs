//! Service configuration loaded from a TOML file.
//!
//! ```toml
//! stations = [6323, 6283]            # primary first, then fallbacks
//!
//! [general]
//! data_collection_interval = 300     # seconds between feed downloads
//! data_display_interval = 1.0        # seconds between frame pushes
//! barometric_trend = true
//!
//! [spi]
//! channel = 0
//! frequency = 250000
//!
//! [[bits]]
//! key = "temperature"
//! length = 10
//! min = -39.9
//! max = 49.9
//! step = 0.1
//! ```
//!
//! The `[[bits]]` entries form the frame layout, in order. The layout is
//! validated while loading, so a configuration whose fields cannot hold
//! their declared range never reaches the encoder.

use std::path::Path;

use serde::Deserialize;

use crate::catalog::{FieldDescriptor, FrameLayout};
use crate::ingest::buienradar::BUIENRADAR_FEED_URL;
use crate::logging::LogLevel;
use crate::model::{StationId, WeatherError};

pub const DEFAULT_CONFIG_PATH: &str = "weathervane.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "WEATHERVANE_CONFIG";

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    general: GeneralConfig,
    #[serde(default)]
    spi: SpiConfig,
    #[serde(default)]
    logging: LoggingConfig,
    stations: Vec<StationId>,
    bits: Vec<BitConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Seconds between feed downloads.
    pub data_collection_interval: u64,
    /// Seconds between frame pushes to the display.
    pub data_display_interval: f64,
    /// Data provider; only "buienradar" is supported.
    pub source: String,
    /// Derive the barometric trend from pressure history instead of
    /// always sending "stable".
    pub barometric_trend: bool,
    /// Send fixed test patterns instead of weather frames.
    pub test: bool,
    pub feed_url: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_collection_interval: 300,
            data_display_interval: 1.0,
            source: "buienradar".to_string(),
            barometric_trend: false,
            test: false,
            feed_url: BUIENRADAR_FEED_URL.to_string(),
        }
    }
}

/// Settings for the SPI link. Carried for the transport; not used by the
/// encoder itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpiConfig {
    pub channel: u8,
    pub frequency: u32,
    pub library: String,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            frequency: 250_000,
            library: "spidev".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: true,
        }
    }
}

impl LoggingConfig {
    pub fn min_level(&self) -> Result<LogLevel, WeatherError> {
        LogLevel::parse(&self.level)
            .ok_or_else(|| WeatherError::ConfigError(format!("unknown log level '{}'", self.level)))
    }
}

/// One `[[bits]]` entry. Range and step are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct BitConfig {
    pub key: String,
    pub length: u8,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

impl BitConfig {
    fn descriptor(&self) -> FieldDescriptor {
        let base = FieldDescriptor::new(self.key.clone(), self.length);
        let (min, max, step) = (
            self.min.unwrap_or(base.min),
            self.max.unwrap_or(base.max),
            self.step.unwrap_or(base.step),
        );
        base.with_range(min, max, step)
    }
}

// ---------------------------------------------------------------------------
// Loaded configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub general: GeneralConfig,
    pub spi: SpiConfig,
    pub logging: LoggingConfig,
    /// Station numbers in priority order; the first is the primary.
    pub stations: Vec<StationId>,
    pub layout: FrameLayout,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WeatherError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            WeatherError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, WeatherError> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| WeatherError::ConfigError(e.to_string()))?;

        if file.stations.is_empty() {
            return Err(WeatherError::ConfigError(
                "at least one station is required".to_string(),
            ));
        }
        if file.general.source != "buienradar" {
            return Err(WeatherError::ConfigError(format!(
                "data provider '{}' not supported",
                file.general.source
            )));
        }
        file.logging.min_level()?;

        let layout = FrameLayout::new(file.bits.iter().map(BitConfig::descriptor).collect())?;

        Ok(Self {
            general: file.general,
            spi: file.spi,
            logging: file.logging,
            stations: file.stations,
            layout,
        })
    }
}

/// Resolves the configuration path: command line, then environment, then
/// the default file name.
pub fn resolve_path(cli_path: Option<&str>) -> String {
    cli_path
        .map(String::from)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
