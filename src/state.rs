//! Total, immutable parameter state and its persisted envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{KEY_COUNT, ParameterKey};

/// Version number for serialized [`StateEnvelope`] payloads.
pub const STATE_FORMAT_VERSION: u16 = 1;

/// Value of every [`ParameterKey`].
///
/// States are never edited in place; [`ParameterState::with`] returns a new
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    values: [f32; KEY_COUNT],
}

impl ParameterState {
    /// Wraps raw values indexed by [`ParameterKey::index`].
    pub fn from_values(values: [f32; KEY_COUNT]) -> Self {
        Self { values }
    }

    /// Value of `key`.
    pub fn get(&self, key: ParameterKey) -> f32 {
        self.values[key.index()]
    }

    /// Returns a copy with `key` set to `value`.
    pub fn with(mut self, key: ParameterKey, value: f32) -> Self {
        self.values[key.index()] = value;
        self
    }

    /// Raw values in canonical key order.
    pub fn values(&self) -> &[f32; KEY_COUNT] {
        &self.values
    }

    /// Iterates `(key, value)` pairs in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterKey, f32)> + '_ {
        ParameterKey::ALL.iter().map(|key| (*key, self.get(*key)))
    }

    /// Per-key comparison within `epsilon`.
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

/// Errors decoding a persisted [`StateEnvelope`].
#[derive(Debug, Error)]
pub enum StateCodecError {
    /// Payload was not valid JSON for the envelope.
    #[error("state payload decode failed: {0}")]
    Json(#[from] serde_json::Error),
    /// Payload was written by an unknown format version.
    #[error("unsupported state format version: {0}")]
    UnsupportedVersion(u16),
}

/// Versioned wrapper for persisting a final [`ParameterState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEnvelope {
    /// Payload format version.
    pub format_version: u16,
    /// Wrapped state.
    pub state: ParameterState,
}

impl StateEnvelope {
    /// Constructs an envelope using [`STATE_FORMAT_VERSION`].
    pub fn new(state: ParameterState) -> Self {
        Self {
            format_version: STATE_FORMAT_VERSION,
            state,
        }
    }

    /// Encodes the envelope as JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, StateCodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes an envelope and returns the wrapped state.
    pub fn decode(payload: &[u8]) -> Result<ParameterState, StateCodecError> {
        let env: StateEnvelope = serde_json::from_slice(payload)?;
        if env.format_version != STATE_FORMAT_VERSION {
            return Err(StateCodecError::UnsupportedVersion(env.format_version));
        }
        Ok(env.state)
    }
}
