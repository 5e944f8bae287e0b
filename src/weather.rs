//! Derived meteorological quantities.
//!
//! Formulas follow the pywws conversions: Environment Canada wind chill and
//! the NWS Rothfusz heat index regression.

/// Below this wind speed (m/s) wind chill equals the air temperature.
const CALM_WIND_MS: f64 = 1.3;

/// Heat index is only defined from this temperature (°C) upwards.
const HEAT_INDEX_MIN_TEMP_C: f64 = 26.7;

/// Heat index is only defined from this relative humidity (%) upwards.
const HEAT_INDEX_MIN_HUMIDITY: f64 = 40.0;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn temp_f(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn temp_c(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Wind chill in °C for a wind speed in m/s. Negative speeds are treated
/// as missing.
pub fn wind_chill(wind_speed_ms: Option<f64>, temperature_c: Option<f64>) -> Option<f64> {
    let (v, t) = (wind_speed_ms?, temperature_c?);
    if v < 0.0 {
        return None;
    }
    if v < CALM_WIND_MS {
        return Some(t);
    }
    let v16 = v.powf(0.16);
    Some(round1(13.12 + 0.6215 * t - 13.96 * v16 + 0.4867 * t * v16))
}

/// Heat index in °C.
pub fn heat_index(temperature_c: Option<f64>, humidity: Option<f64>) -> Option<f64> {
    let (t, rh) = (temperature_c?, humidity?);
    if t < HEAT_INDEX_MIN_TEMP_C || rh < HEAT_INDEX_MIN_HUMIDITY {
        return Some(t);
    }
    let tf = temp_f(t);
    let hi = -42.379 + 2.04901523 * tf + 10.14333127 * rh
        - 0.22475541 * tf * rh
        - 0.00683783 * tf.powi(2)
        - 0.05481717 * rh.powi(2)
        + 0.00122874 * tf.powi(2) * rh
        + 0.00085282 * tf * rh.powi(2)
        - 0.00000199 * tf.powi(2) * rh.powi(2);
    Some(round1(temp_c(hi)))
}

/// "Feels like" temperature: wind chill below 10 °C, heat index above.
pub fn apparent_temperature(
    wind_speed_ms: Option<f64>,
    temperature_c: Option<f64>,
    humidity: Option<f64>,
) -> Option<f64> {
    let t = temperature_c?;
    if wind_speed_ms.is_none() && humidity.is_none() {
        return Some(t);
    }
    if t < 10.0 {
        wind_chill(wind_speed_ms, Some(t))
    } else {
        heat_index(Some(t), humidity)
    }
}
