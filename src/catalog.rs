//! Field catalog: how each measurement is laid out in the transmission frame.
//!
//! The display firmware expects a fixed sequence of fields, each quantized
//! into a fixed number of bits. A `FrameLayout` is that sequence. Layouts are
//! validated once when they are built, so the encoder can assume every value
//! it produces fits its slot.
//!
//! The kind of each field (categorical, boolean, random filler or plain
//! numeric) is decided here from the field name and stored in the descriptor,
//! so the encoder dispatches on a closed enum instead of on strings.

use crate::model::{
    WeatherError, FIELD_PRECIPITATION, FIELD_RANDOM, FIELD_WIND_DIRECTION, SYNTHETIC_FIELDS,
};

// ---------------------------------------------------------------------------
// Compass codes
// ---------------------------------------------------------------------------

/// Dutch compass codes in transmission order; the index is the 4-bit code.
/// O = oost (east), Z = zuid (south).
pub static COMPASS_CODES: [&str; 16] = [
    "N", "NNO", "NO", "ONO", "O", "OZO", "ZO", "ZZO",
    "Z", "ZZW", "ZW", "WZW", "W", "WNW", "NW", "NNW",
];

/// Bits needed for a compass code.
pub const COMPASS_BITS: u8 = 4;

/// Looks up the 4-bit code of a compass direction. Unknown codes map to
/// `None`; the encoder sends those as 0 ("N").
pub fn compass_code(direction: &str) -> Option<u32> {
    COMPASS_CODES
        .iter()
        .position(|c| *c == direction)
        .map(|i| i as u32)
}

// ---------------------------------------------------------------------------
// Field descriptors
// ---------------------------------------------------------------------------

pub const DEFAULT_MIN: f64 = 0.0;
pub const DEFAULT_MAX: f64 = 255.0;
pub const DEFAULT_STEP: f64 = 1.0;

/// Widest field the frame supports.
pub const MAX_BIT_WIDTH: u8 = 32;

/// Absorbs binary floating point error in `(value - min) / step` so that
/// e.g. 58.3 / 0.1 lands in bucket 583 rather than 582.
const QUANTIZE_TOLERANCE: f64 = 1e-9;

/// How a field is turned into bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Compass code looked up in `COMPASS_CODES`.
    Categorical,
    /// 1 if the underlying number is present and positive.
    Boolean,
    /// Uniformly random bits, independent of the reading.
    Random,
    /// Clamped and quantized number.
    Numeric,
}

impl FieldKind {
    pub fn for_name(name: &str) -> Self {
        match name {
            FIELD_WIND_DIRECTION => FieldKind::Categorical,
            FIELD_PRECIPITATION => FieldKind::Boolean,
            FIELD_RANDOM => FieldKind::Random,
            _ => FieldKind::Numeric,
        }
    }
}

/// One slot of the transmission frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub bit_width: u8,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// A field with the default range 0..=255 in steps of 1. Fields narrower
    /// than a byte get their default maximum cut down to what the bits hold,
    /// so flags and padding can be declared with a width alone.
    pub fn new(name: impl Into<String>, bit_width: u8) -> Self {
        let name = name.into();
        let kind = FieldKind::for_name(&name);
        let mut field = Self {
            name,
            bit_width,
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            step: DEFAULT_STEP,
            kind,
        };
        if (1..8).contains(&bit_width) {
            field.max = field.max_code() as f64;
        }
        field
    }

    pub fn with_range(mut self, min: f64, max: f64, step: f64) -> Self {
        self.min = min;
        self.max = max;
        self.step = step;
        self
    }

    /// Largest integer the field's bits can hold.
    pub fn max_code(&self) -> u32 {
        if self.bit_width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bit_width) - 1
        }
    }

    /// True for names the reconciler must not look up on stations.
    pub fn is_synthetic(&self) -> bool {
        SYNTHETIC_FIELDS.contains(&self.name.as_str())
    }

    /// Clamps `value` into `[min, max]` and maps it to its bucket
    /// `(value - min) / step`, truncated. NaN maps to bucket 0.
    pub fn quantize(&self, value: f64) -> u32 {
        if value.is_nan() {
            return 0;
        }
        let clamped = value.max(self.min).min(self.max);
        let bucket = ((clamped - self.min) / self.step + QUANTIZE_TOLERANCE).floor();
        // Saturating float-to-int cast; validated layouts never exceed max_code.
        (bucket as u32).min(self.max_code())
    }

    fn validate(&self) -> Result<(), WeatherError> {
        let fail = |reason: String| {
            Err(WeatherError::InvalidLayout {
                field: self.name.clone(),
                reason,
            })
        };

        if self.bit_width == 0 || self.bit_width > MAX_BIT_WIDTH {
            return fail(format!(
                "bit width {} outside 1..={}",
                self.bit_width, MAX_BIT_WIDTH
            ));
        }

        match self.kind {
            FieldKind::Categorical if self.bit_width < COMPASS_BITS => fail(format!(
                "compass codes need {} bits, got {}",
                COMPASS_BITS, self.bit_width
            )),
            FieldKind::Numeric => {
                if !self.step.is_finite() || self.step <= 0.0 {
                    return fail(format!("step {} must be a positive number", self.step));
                }
                if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
                    return fail(format!("range {}..{} is not valid", self.min, self.max));
                }
                let top = ((self.max - self.min) / self.step + QUANTIZE_TOLERANCE).floor();
                if top > self.max_code() as f64 {
                    return fail(format!(
                        "{} buckets do not fit in {} bits",
                        top as u64 + 1,
                        self.bit_width
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Frame layout
// ---------------------------------------------------------------------------

/// Ordered, validated list of field descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    fields: Vec<FieldDescriptor>,
}

impl FrameLayout {
    /// Validates every descriptor. A layout that cannot be encoded without
    /// silently truncating a value is rejected here rather than at encode time.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, WeatherError> {
        for field in &fields {
            field.validate()?;
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn find(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn total_bits(&self) -> usize {
        self.fields.iter().map(|f| f.bit_width as usize).sum()
    }

    /// Frame length in bytes; the last byte is zero-padded.
    pub fn frame_len(&self) -> usize {
        self.total_bits().div_ceil(8)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
