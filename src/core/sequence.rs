//! Operation batches and the timestamped deltas stored in history.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::{
    core::history::HistoryError,
    op::Operation,
    space::ParameterSpace,
    state::ParameterState,
    types::{ParameterKey, TimestampMs, now_ms},
};

/// Label prefix given to inverted deltas.
pub const UNDO_LABEL_PREFIX: &str = "Undo: ";

/// Ordered, non-empty batch of operations forming one semantic edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOperationSequence")]
pub struct OperationSequence {
    operations: Vec<Operation>,
    label: String,
}

#[derive(Deserialize)]
struct RawOperationSequence {
    operations: Vec<Operation>,
    label: String,
}

impl TryFrom<RawOperationSequence> for OperationSequence {
    type Error = HistoryError;

    fn try_from(raw: RawOperationSequence) -> Result<Self, Self::Error> {
        Self::new(raw.operations, raw.label)
    }
}

impl OperationSequence {
    /// Builds a sequence, rejecting an empty operation list.
    pub fn new(operations: Vec<Operation>, label: impl Into<String>) -> Result<Self, HistoryError> {
        if operations.is_empty() {
            return Err(HistoryError::EmptySequence);
        }
        Ok(Self {
            operations,
            label: label.into(),
        })
    }

    /// Operations in application order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Always false; sequences are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Union of the keys touched by every operation.
    pub fn affected_keys(&self) -> HashSet<ParameterKey> {
        self.operations
            .iter()
            .flat_map(|op| op.affected_keys())
            .collect()
    }

    /// Heuristic memory cost: per-operation cost plus label length.
    pub fn estimated_cost(&self) -> usize {
        self.operations
            .iter()
            .map(Operation::estimated_cost)
            .sum::<usize>()
            + self.label.len()
    }
}

/// Labelled, timestamped [`OperationSequence`]; the unit of the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Wrapped operations.
    pub sequence: OperationSequence,
    /// Creation (or merge) time.
    pub created_at_ms: TimestampMs,
    /// Display label.
    pub label: String,
}

impl Delta {
    /// Wraps `sequence`, stamped now and labelled like the sequence.
    pub fn new(sequence: OperationSequence) -> Self {
        let label = sequence.label().to_string();
        Self {
            sequence,
            created_at_ms: now_ms(),
            label,
        }
    }

    /// Convenience constructor from raw operations.
    pub fn from_operations(operations: Vec<Operation>, label: impl Into<String>) -> Result<Self, HistoryError> {
        Ok(Self::new(OperationSequence::new(operations, label)?))
    }

    /// Operations in application order.
    pub fn operations(&self) -> &[Operation] {
        self.sequence.operations()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Always false; deltas wrap a non-empty sequence.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Keys touched by the delta.
    pub fn affected_keys(&self) -> HashSet<ParameterKey> {
        self.sequence.affected_keys()
    }

    /// Heuristic memory cost.
    pub fn estimated_cost(&self) -> usize {
        self.sequence.estimated_cost()
    }

    /// Folds every operation over `state` in order.
    pub fn apply_to(&self, space: &ParameterSpace, state: ParameterState) -> ParameterState {
        self.operations()
            .iter()
            .fold(state, |acc, op| op.apply(space, acc))
    }

    /// Delta undoing `self`: inverted operations in reverse order.
    pub fn inverse(&self, space: &ParameterSpace) -> Delta {
        let operations = self
            .operations()
            .iter()
            .rev()
            .map(|op| op.inverse(space))
            .collect();
        let label = format!("{UNDO_LABEL_PREFIX}{}", self.label);
        Delta {
            sequence: OperationSequence {
                operations,
                label: label.clone(),
            },
            created_at_ms: now_ms(),
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequence_is_rejected() {
        assert!(matches!(
            OperationSequence::new(Vec::new(), "nothing"),
            Err(HistoryError::EmptySequence)
        ));
    }

    #[test]
    fn decoding_rejects_empty_operations() {
        let err = serde_json::from_str::<OperationSequence>(r#"{"operations":[],"label":"x"}"#)
            .expect_err("empty sequence must not decode");
        assert!(err.to_string().contains("operation sequence is empty"));
    }

    #[test]
    fn delta_survives_json() {
        let base = ParameterSpace::photo().default_state();
        let delta = Delta::from_operations(vec![Operation::set(&base, ParameterKey::Shadows, 0.5)], "Shadows")
            .expect("delta");
        let json = serde_json::to_string(&delta).expect("encode");
        assert_eq!(serde_json::from_str::<Delta>(&json).expect("decode"), delta);
    }

    #[test]
    fn cost_counts_label_length() {
        let seq = OperationSequence::new(
            vec![Operation::SetValue {
                key: ParameterKey::Blur,
                new_value: 2.0,
                old_value: 0.0,
            }],
            "Blur",
        )
        .expect("sequence");
        assert_eq!(seq.estimated_cost(), crate::op::OP_BASE_COST + 4);
    }

    #[test]
    fn inverse_reverses_and_relabels() {
        let space = ParameterSpace::photo();
        let base = space.default_state();
        let first = Operation::set(&base, ParameterKey::Vignette, 0.5);
        let mid = first.apply(&space, base);
        let second = Operation::set(&mid, ParameterKey::Vignette, 1.0);
        let delta = Delta::from_operations(vec![first.clone(), second.clone()], "Vignette").expect("delta");

        let inv = delta.inverse(&space);
        assert_eq!(inv.label, "Undo: Vignette");
        assert_eq!(inv.operations(), &[second.inverse(&space), first.inverse(&space)]);
        assert_eq!(inv.apply_to(&space, delta.apply_to(&space, base)), base);
    }
}
