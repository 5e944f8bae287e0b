//! One collection cycle: merge → annotate → encode.
//!
//! `Pipeline` holds the little state that lives across cycles: the air
//! pressure history feeding the barometric trend and the previous frame,
//! used to tell whether the display needs a new push.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::annotate::{annotate_with_trend, is_stale_at, STALE_AFTER_MINUTES};
use crate::catalog::FrameLayout;
use crate::config::Config;
use crate::frame::encode_with_rng;
use crate::logging::{self, Component};
use crate::model::{
    Record, StationId, FIELD_AIR_PRESSURE, FIELD_DATA_FROM_FALLBACK, FIELD_ERROR,
};
use crate::reconcile::{merge, unresolved_fields};
use crate::trend::{BarometricTrend, PressureHistory};

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutput {
    /// Merged and annotated reading.
    pub reading: Record,
    pub frame: Vec<u8>,
    /// False when the frame is identical to the previous cycle's.
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    stations: Vec<StationId>,
    layout: FrameLayout,
    pressure_history: Option<PressureHistory>,
    previous_frame: Option<Vec<u8>>,
}

impl Pipeline {
    /// A pipeline that always reports a stable barometric trend.
    pub fn new(stations: Vec<StationId>, layout: FrameLayout) -> Self {
        Self {
            stations,
            layout,
            pressure_history: None,
            previous_frame: None,
        }
    }

    /// Derive the trend from the last `history_len` pressure readings.
    pub fn with_pressure_trend(mut self, history_len: usize) -> Self {
        self.pressure_history = Some(PressureHistory::new(history_len));
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let pipeline = Self::new(config.stations.clone(), config.layout.clone());
        if config.general.barometric_trend {
            pipeline.with_pressure_trend(crate::trend::DEFAULT_HISTORY_LEN)
        } else {
            pipeline
        }
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn run_cycle(
        &mut self,
        records: &HashMap<StationId, Record>,
        now: DateTime<Utc>,
    ) -> CycleOutput {
        self.run_cycle_with_rng(records, now, &mut rand::thread_rng())
    }

    pub fn run_cycle_with_rng<R: Rng>(
        &mut self,
        records: &HashMap<StationId, Record>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> CycleOutput {
        let merged = merge(records, &self.stations, self.layout.fields());
        self.report_merge(records, &merged);

        let trend = match self.pressure_history.as_mut() {
            Some(history) => {
                if let Some(pressure) = merged.number(FIELD_AIR_PRESSURE) {
                    history.push(pressure);
                }
                history.trend()
            }
            None => BarometricTrend::Stable,
        };

        match is_stale_at(&merged, STALE_AFTER_MINUTES, now) {
            Ok(false) => {}
            Ok(true) => logging::warn(Component::Feed, None, "reading is older than two hours"),
            Err(e) => logging::warn(Component::Feed, None, &format!("unusable timestamp: {}", e)),
        }

        let reading = annotate_with_trend(&merged, trend, now);
        let frame = encode_with_rng(&reading, &self.layout, rng);
        let changed = self.previous_frame.as_deref() != Some(frame.as_slice());

        if reading.flag(FIELD_ERROR) {
            logging::warn(Component::Encode, None, "sending frame with error flag set");
        }
        logging::debug(
            Component::Encode,
            None,
            &format!("frame {} (changed: {})", logging::hex_frame(&frame), changed),
        );

        self.previous_frame = Some(frame.clone());
        CycleOutput {
            reading,
            frame,
            changed,
        }
    }

    /// Logs what `merge` decided. Kept out of `merge` so the core steps
    /// never touch the logger.
    fn report_merge(&self, records: &HashMap<StationId, Record>, merged: &Record) {
        if let Some(primary) = self.stations.first() {
            if !records.contains_key(primary) {
                logging::warn(
                    Component::Merge,
                    Some(primary.to_string().as_str()),
                    "primary station missing from feed, using first fallback",
                );
            }
        }
        if merged.flag(FIELD_DATA_FROM_FALLBACK) {
            logging::debug(Component::Merge, None, "reading uses fallback station data");
        }
        if merged.flag(FIELD_ERROR) {
            let missing = unresolved_fields(records, &self.stations, self.layout.fields());
            if missing.is_empty() {
                logging::error(Component::Merge, None, "no usable station in feed");
            } else {
                logging::warn(
                    Component::Merge,
                    None,
                    &format!("no station reports {}", missing.join(", ")),
                );
            }
        }
    }
}
