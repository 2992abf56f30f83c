//! Reversible parameter operations and the state diff that produces them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    space::ParameterSpace,
    state::ParameterState,
    types::ParameterKey,
};

/// Preset name used when a `ResetAll` is inverted into a bulk restore.
pub const RESTORE_PRESET_NAME: &str = "Restore";

/// Heuristic cost of one operation, before map payloads.
pub const OP_BASE_COST: usize = 32;

/// Heuristic cost of one entry in a preset or reset map.
pub const MAP_ENTRY_COST: usize = 8;

/// One reversible change to a [`ParameterState`].
///
/// Every variant carries the prior-state payload its inverse needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Overwrite one key.
    SetValue {
        /// Key to write.
        key: ParameterKey,
        /// Value written.
        new_value: f32,
        /// Value immediately before the write.
        old_value: f32,
    },
    /// Add to one key, clamped to its range.
    AdjustValue {
        /// Key to adjust.
        key: ParameterKey,
        /// Requested change.
        delta: f32,
        /// Negated change actually applied when captured.
        old_delta: f32,
    },
    /// Restore one key to its default.
    ResetToDefault {
        /// Key to reset.
        key: ParameterKey,
        /// Value immediately before the reset.
        old_value: f32,
    },
    /// Restore every key to its default.
    ResetAll {
        /// Full prior state.
        old_values: BTreeMap<ParameterKey, f32>,
    },
    /// Bulk overwrite of the keys present in `values`.
    ApplyPreset {
        /// Preset display name.
        name: String,
        /// Values written.
        values: BTreeMap<ParameterKey, f32>,
        /// Prior values for exactly the keys in `values`.
        old_values: BTreeMap<ParameterKey, f32>,
    },
}

impl Operation {
    /// Captures a `SetValue` against `state`.
    pub fn set(state: &ParameterState, key: ParameterKey, value: f32) -> Self {
        Operation::SetValue {
            key,
            new_value: value,
            old_value: state.get(key),
        }
    }

    /// Captures an `AdjustValue` against `state`, recording the clamped change.
    pub fn adjust(space: &ParameterSpace, state: &ParameterState, key: ParameterKey, delta: f32) -> Self {
        let cur = state.get(key);
        let next = space.clamp(key, cur + delta);
        Operation::AdjustValue {
            key,
            delta,
            old_delta: cur - next,
        }
    }

    /// Captures a `ResetToDefault` against `state`.
    pub fn reset(state: &ParameterState, key: ParameterKey) -> Self {
        Operation::ResetToDefault {
            key,
            old_value: state.get(key),
        }
    }

    /// Captures a `ResetAll` against `state`.
    pub fn reset_all(state: &ParameterState) -> Self {
        Operation::ResetAll {
            old_values: state.iter().collect(),
        }
    }

    /// Captures an `ApplyPreset` against `state`.
    pub fn preset(
        state: &ParameterState,
        name: impl Into<String>,
        values: BTreeMap<ParameterKey, f32>,
    ) -> Self {
        let old_values = values.keys().map(|key| (*key, state.get(*key))).collect();
        Operation::ApplyPreset {
            name: name.into(),
            values,
            old_values,
        }
    }

    /// Key touched by a single-key variant, `None` for bulk variants.
    pub fn single_key(&self) -> Option<ParameterKey> {
        match self {
            Operation::SetValue { key, .. }
            | Operation::AdjustValue { key, .. }
            | Operation::ResetToDefault { key, .. } => Some(*key),
            Operation::ResetAll { .. } | Operation::ApplyPreset { .. } => None,
        }
    }

    /// Every key this operation may write, in canonical order.
    pub fn affected_keys(&self) -> Vec<ParameterKey> {
        match self {
            Operation::ResetAll { .. } => ParameterKey::ALL.to_vec(),
            Operation::ApplyPreset { values, .. } => values.keys().copied().collect(),
            single => single.single_key().into_iter().collect(),
        }
    }

    /// Heuristic memory cost.
    pub fn estimated_cost(&self) -> usize {
        match self {
            Operation::ResetAll { old_values } => OP_BASE_COST + old_values.len() * MAP_ENTRY_COST,
            Operation::ApplyPreset {
                name,
                values,
                old_values,
            } => OP_BASE_COST + name.len() + (values.len() + old_values.len()) * MAP_ENTRY_COST,
            _ => OP_BASE_COST,
        }
    }

    /// Applies the operation, clamping every written value into range.
    pub fn apply(&self, space: &ParameterSpace, state: ParameterState) -> ParameterState {
        match self {
            Operation::SetValue { key, new_value, .. } => state.with(*key, space.clamp(*key, *new_value)),
            Operation::AdjustValue { key, delta, .. } => {
                state.with(*key, space.clamp(*key, state.get(*key) + delta))
            }
            Operation::ResetToDefault { key, .. } => state.with(*key, space.default_value(*key)),
            Operation::ResetAll { .. } => space.default_state(),
            Operation::ApplyPreset { values, .. } => values
                .iter()
                .fold(state, |acc, (key, value)| acc.with(*key, space.clamp(*key, *value))),
        }
    }

    /// Operation undoing `self` when applied to the state `self` produced.
    ///
    /// Every inverse is exact except `AdjustValue`'s: it re-adds the recorded
    /// `old_delta`, so `cur + (clamp(cur + delta) - cur)` can land one f32
    /// rounding step away from `cur`. Compare restored states with
    /// [`ParameterState::approx_eq`].
    pub fn inverse(&self, space: &ParameterSpace) -> Operation {
        match self {
            Operation::SetValue {
                key,
                new_value,
                old_value,
            } => Operation::SetValue {
                key: *key,
                new_value: *old_value,
                old_value: *new_value,
            },
            Operation::AdjustValue { key, old_delta, .. } => Operation::AdjustValue {
                key: *key,
                delta: *old_delta,
                old_delta: -*old_delta,
            },
            Operation::ResetToDefault { key, old_value } => Operation::SetValue {
                key: *key,
                new_value: *old_value,
                old_value: space.default_value(*key),
            },
            Operation::ResetAll { old_values } => Operation::ApplyPreset {
                name: RESTORE_PRESET_NAME.to_string(),
                values: old_values.clone(),
                old_values: old_values
                    .keys()
                    .map(|key| (*key, space.default_value(*key)))
                    .collect(),
            },
            Operation::ApplyPreset {
                name,
                values,
                old_values,
            } => Operation::ApplyPreset {
                name: name.clone(),
                values: old_values.clone(),
                old_values: values.clone(),
            },
        }
    }
}

/// `SetValue` operations turning `from` into `to`, in canonical key order.
///
/// Empty iff the states are equal.
pub fn diff(from: &ParameterState, to: &ParameterState) -> Vec<Operation> {
    ParameterKey::ALL
        .iter()
        .filter(|key| from.get(**key) != to.get(**key))
        .map(|key| Operation::SetValue {
            key: *key,
            new_value: to.get(*key),
            old_value: from.get(*key),
        })
        .collect()
}
