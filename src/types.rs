//! Shared primitive types: parameter keys, ranges, timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall-clock timestamp in milliseconds since the Unix epoch.
pub type TimestampMs = u64;

/// Number of adjustable parameters.
pub const KEY_COUNT: usize = 12;

/// One adjustable photo parameter.
///
/// Declaration order is the canonical key order used by diffs and replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParameterKey {
    /// Additive brightness.
    Brightness,
    /// Exposure in stops.
    Exposure,
    /// Contrast multiplier.
    Contrast,
    /// Saturation multiplier.
    Saturation,
    /// Sharpening amount.
    Sharpness,
    /// Blur radius.
    Blur,
    /// Vignette intensity.
    Vignette,
    /// Noise reduction amount.
    NoiseReduction,
    /// Highlight recovery.
    Highlights,
    /// Shadow lift.
    Shadows,
    /// White balance temperature in kelvin.
    Temperature,
    /// Black point offset.
    BlackPoint,
}

impl ParameterKey {
    /// Every key in canonical order.
    pub const ALL: [ParameterKey; KEY_COUNT] = [
        ParameterKey::Brightness,
        ParameterKey::Exposure,
        ParameterKey::Contrast,
        ParameterKey::Saturation,
        ParameterKey::Sharpness,
        ParameterKey::Blur,
        ParameterKey::Vignette,
        ParameterKey::NoiseReduction,
        ParameterKey::Highlights,
        ParameterKey::Shadows,
        ParameterKey::Temperature,
        ParameterKey::BlackPoint,
    ];

    /// Position of this key in [`ParameterKey::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            ParameterKey::Brightness => "brightness",
            ParameterKey::Exposure => "exposure",
            ParameterKey::Contrast => "contrast",
            ParameterKey::Saturation => "saturation",
            ParameterKey::Sharpness => "sharpness",
            ParameterKey::Blur => "blur",
            ParameterKey::Vignette => "vignette",
            ParameterKey::NoiseReduction => "noiseReduction",
            ParameterKey::Highlights => "highlights",
            ParameterKey::Shadows => "shadows",
            ParameterKey::Temperature => "temperature",
            ParameterKey::BlackPoint => "blackPoint",
        }
    }
}

/// Closed interval `[min, max]` of legal values for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    /// Inclusive lower bound.
    pub min: f32,
    /// Inclusive upper bound.
    pub max: f32,
}

impl ParameterRange {
    /// Builds a range, swapping the bounds if they arrive reversed.
    ///
    /// A NaN bound is treated as unbounded on that side.
    pub fn new(min: f32, max: f32) -> Self {
        let min = if min.is_nan() { f32::NEG_INFINITY } else { min };
        let max = if max.is_nan() { f32::INFINITY } else { max };
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Clamps `value` into the range. Never panics, even on NaN bounds.
    pub fn clamp(&self, value: f32) -> f32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Returns true when `value` lies inside the range.
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> TimestampMs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
