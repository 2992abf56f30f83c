//! Injectable parameter space: defaults and legal ranges per key.

use serde::{Deserialize, Serialize};

use crate::{
    state::ParameterState,
    types::{KEY_COUNT, ParameterKey, ParameterRange},
};

/// Default value and legal range for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Value the key takes in the all-defaults state.
    pub default_value: f32,
    /// Legal values for the key.
    pub range: ParameterRange,
}

impl ParameterSpec {
    /// Builds a spec, clamping the default into the range.
    pub fn new(default_value: f32, min: f32, max: f32) -> Self {
        let range = ParameterRange::new(min, max);
        let default_value = if default_value.is_nan() {
            range.clamp(0.0)
        } else {
            range.clamp(default_value)
        };
        Self {
            default_value,
            range,
        }
    }
}

/// Fixed table of [`ParameterSpec`] values, one per [`ParameterKey`].
///
/// Passed to the history engine at construction so tests can replay against
/// synthetic spaces instead of the photo editor's table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    specs: [ParameterSpec; KEY_COUNT],
}

impl Default for ParameterSpace {
    fn default() -> Self {
        Self::photo()
    }
}

impl ParameterSpace {
    /// Standard photo-adjustment table.
    pub fn photo() -> Self {
        let specs = ParameterKey::ALL.map(|key| match key {
            ParameterKey::Brightness => ParameterSpec::new(0.0, -1.0, 1.0),
            ParameterKey::Exposure => ParameterSpec::new(0.0, -3.0, 3.0),
            ParameterKey::Contrast => ParameterSpec::new(1.0, 0.0, 2.0),
            ParameterKey::Saturation => ParameterSpec::new(1.0, 0.0, 2.0),
            ParameterKey::Sharpness => ParameterSpec::new(0.0, 0.0, 2.0),
            ParameterKey::Blur => ParameterSpec::new(0.0, 0.0, 20.0),
            ParameterKey::Vignette => ParameterSpec::new(0.0, 0.0, 2.0),
            ParameterKey::NoiseReduction => ParameterSpec::new(0.0, 0.0, 1.0),
            ParameterKey::Highlights => ParameterSpec::new(1.0, 0.0, 1.0),
            ParameterKey::Shadows => ParameterSpec::new(0.0, -1.0, 1.0),
            ParameterKey::Temperature => ParameterSpec::new(6500.0, 2000.0, 10000.0),
            ParameterKey::BlackPoint => ParameterSpec::new(0.0, 0.0, 0.5),
        });
        Self { specs }
    }

    /// Space where every key defaults to `default_value` within `[min, max]`.
    pub fn uniform(default_value: f32, min: f32, max: f32) -> Self {
        Self {
            specs: [ParameterSpec::new(default_value, min, max); KEY_COUNT],
        }
    }

    /// Returns a copy with the spec for `key` replaced.
    pub fn with_spec(mut self, key: ParameterKey, spec: ParameterSpec) -> Self {
        self.specs[key.index()] = spec;
        self
    }

    /// Spec for `key`.
    pub fn spec(&self, key: ParameterKey) -> &ParameterSpec {
        &self.specs[key.index()]
    }

    /// Default value for `key`.
    pub fn default_value(&self, key: ParameterKey) -> f32 {
        self.specs[key.index()].default_value
    }

    /// Legal range for `key`.
    pub fn range(&self, key: ParameterKey) -> ParameterRange {
        self.specs[key.index()].range
    }

    /// Clamps `value` into the range of `key`.
    pub fn clamp(&self, key: ParameterKey, value: f32) -> f32 {
        self.specs[key.index()].range.clamp(value)
    }

    /// State holding every key at its default.
    pub fn default_state(&self) -> ParameterState {
        ParameterState::from_values(self.specs.map(|s| s.default_value))
    }

    /// Returns true when every value of `state` is within range.
    pub fn contains(&self, state: &ParameterState) -> bool {
        ParameterKey::ALL
            .iter()
            .all(|key| self.range(*key).contains(state.get(*key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_defaults_lie_in_range() {
        let space = ParameterSpace::photo();
        assert!(space.contains(&space.default_state()));
        assert_eq!(space.default_value(ParameterKey::Contrast), 1.0);
    }

    #[test]
    fn spec_clamps_default_and_orders_bounds() {
        let spec = ParameterSpec::new(5.0, 1.0, -1.0);
        assert_eq!(spec.range.min, -1.0);
        assert_eq!(spec.range.max, 1.0);
        assert_eq!(spec.default_value, 1.0);
    }

    #[test]
    fn nan_inputs_build_a_usable_spec() {
        let spec = ParameterSpec::new(f32::NAN, 0.5, f32::NAN);
        assert_eq!(spec.range.min, 0.5);
        assert_eq!(spec.range.max, f32::INFINITY);
        assert_eq!(spec.default_value, 0.5);

        let space = ParameterSpace::photo().with_spec(ParameterKey::Blur, spec);
        assert_eq!(space.clamp(ParameterKey::Blur, 0.0), 0.5);
    }
}
