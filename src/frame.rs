//! Frame encoder: packs an authoritative reading into the display frame.
//!
//! Each field of the layout is turned into an unsigned integer of the
//! field's bit width and the results are concatenated MSB-first in layout
//! order. The encoder never fails: missing values encode as 0 (clamped into
//! range for numeric fields), out-of-range values saturate silently, and
//! unknown compass codes send "N".
//!
//! Everything except the random filler is a pure function of
//! `(reading, layout)`; the encoder does not log.

use rand::Rng;

use crate::bitio::BitWriter;
use crate::catalog::{compass_code, FieldDescriptor, FieldKind, FrameLayout};
use crate::model::{Record, FIELD_WIND_GUSTS, FIELD_WIND_SPEED};

/// Encodes `reading` with filler bits drawn from the thread-local RNG.
pub fn encode(reading: &Record, layout: &FrameLayout) -> Vec<u8> {
    encode_with_rng(reading, layout, &mut rand::thread_rng())
}

/// Encodes `reading` drawing filler bits from `rng`.
pub fn encode_with_rng<R: Rng>(
    reading: &Record,
    layout: &FrameLayout,
    rng: &mut R,
) -> Vec<u8> {
    let codes = field_codes(reading, layout, rng);

    let mut writer = BitWriter::with_capacity(layout.frame_len());
    for (field, code) in layout.fields().iter().zip(codes) {
        writer.write_bits(code, field.bit_width);
    }
    writer.finish()
}

/// Quantized value of every layout field, in layout order, after the wind
/// speed / gusts correction.
pub fn field_codes<R: Rng>(
    reading: &Record,
    layout: &FrameLayout,
    rng: &mut R,
) -> Vec<u32> {
    let mut codes: Vec<u32> = layout
        .fields()
        .iter()
        .map(|field| field_code(reading, field, &mut *rng))
        .collect();
    compensate_wind(reading, layout, &mut codes);
    codes
}

fn field_code<R: Rng>(reading: &Record, field: &FieldDescriptor, rng: &mut R) -> u32 {
    match field.kind {
        FieldKind::Categorical => reading
            .text(&field.name)
            .and_then(compass_code)
            .unwrap_or(0),
        FieldKind::Boolean => match reading.number(&field.name) {
            Some(v) if v > 0.0 => 1,
            _ => 0,
        },
        FieldKind::Random => rng.gen_range(0..=field.max_code()),
        FieldKind::Numeric => match reading.get(&field.name) {
            None => field.quantize(0.0),
            Some(value) if value.is_missing() => field.quantize(0.0),
            Some(value) => value.as_number().map_or(0, |n| field.quantize(n)),
        },
    }
}

/// The mean wind speed may never be sent above the gusts. When both are in
/// the layout and in the reading, the speed code is lowered to the gusts code.
fn compensate_wind(reading: &Record, layout: &FrameLayout, codes: &mut [u32]) {
    let position = |name: &str| layout.fields().iter().position(|f| f.name == name);
    let (Some(speed_at), Some(gusts_at)) = (position(FIELD_WIND_SPEED), position(FIELD_WIND_GUSTS))
    else {
        return;
    };
    if reading.present(FIELD_WIND_SPEED).is_none() || reading.present(FIELD_WIND_GUSTS).is_none() {
        return;
    }

    codes[speed_at] = codes[speed_at].min(codes[gusts_at]);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
