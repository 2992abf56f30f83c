use hashbrown::HashMap;

use crate::{op::Operation, space::ParameterSpace, types::ParameterKey};

/// Collapses runs of single-key operations on the same key into one `SetValue`.
///
/// A run is every single-key operation on a key since the last bulk operation
/// (`ResetAll`, `ApplyPreset`) touching that key. A `SetValue` or
/// `ResetToDefault` overrides the whole run, which collapses into one
/// `SetValue` at the run's first position carrying the run's first old value.
/// An `AdjustValue` folds into a preceding `SetValue`/`ResetToDefault`, but
/// consecutive adjusts are kept since their clamped sum depends on the
/// starting state.
///
/// The net effect on any state is unchanged, the output is never longer than
/// the input, and optimizing an optimized sequence returns it unchanged.
pub fn optimize(space: &ParameterSpace, ops: Vec<Operation>) -> Vec<Operation> {
    if ops.len() < 2 {
        return ops;
    }

    let mut slots: Vec<Option<Operation>> = Vec::with_capacity(ops.len());
    // Invariant: a run is a single SetValue/ResetToDefault or only AdjustValues.
    let mut runs: HashMap<ParameterKey, Vec<usize>> = HashMap::new();

    for op in ops {
        let Some(key) = op.single_key() else {
            for key in op.affected_keys() {
                runs.remove(&key);
            }
            slots.push(Some(op));
            continue;
        };

        let run = runs.entry(key).or_default();
        if let Some(folded) = fold_run(space, key, &slots, run, &op) {
            let first = run[0];
            for idx in run.drain(1..) {
                slots[idx] = None;
            }
            slots[first] = Some(folded);
            continue;
        }

        run.push(slots.len());
        slots.push(Some(op));
    }

    slots.into_iter().flatten().collect()
}

/// Folds `next` into the open run on `key`, yielding one `SetValue`.
fn fold_run(
    space: &ParameterSpace,
    key: ParameterKey,
    slots: &[Option<Operation>],
    run: &[usize],
    next: &Operation,
) -> Option<Operation> {
    let first = run.first().and_then(|idx| slots[*idx].as_ref())?;

    match next {
        Operation::SetValue {
            old_value: observed, ..
        }
        | Operation::ResetToDefault {
            old_value: observed, ..
        } => {
            let new_value = match next {
                Operation::SetValue { new_value, .. } => space.clamp(key, *new_value),
                _ => space.default_value(key),
            };
            let old_value = match first {
                Operation::SetValue { old_value, .. }
                | Operation::ResetToDefault { old_value, .. } => *old_value,
                // Walk back from the value `next` observed through each adjust.
                Operation::AdjustValue { .. } => run
                    .iter()
                    .rev()
                    .filter_map(|idx| slots[*idx].as_ref())
                    .try_fold(*observed, |acc, op| match op {
                        Operation::AdjustValue { old_delta, .. } => Some(acc + old_delta),
                        _ => None,
                    })?,
                _ => return None,
            };
            Some(Operation::SetValue {
                key,
                new_value,
                old_value,
            })
        }
        Operation::AdjustValue { delta, .. } => {
            let (base, old_value) = match first {
                Operation::SetValue {
                    new_value,
                    old_value,
                    ..
                } => (space.clamp(key, *new_value), *old_value),
                Operation::ResetToDefault { old_value, .. } => {
                    (space.default_value(key), *old_value)
                }
                _ => return None,
            };
            Some(Operation::SetValue {
                key,
                new_value: space.clamp(key, base + delta),
                old_value,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn set(key: ParameterKey, new_value: f32, old_value: f32) -> Operation {
        Operation::SetValue {
            key,
            new_value,
            old_value,
        }
    }

    #[test]
    fn consecutive_sets_keep_first_old_value() {
        let space = ParameterSpace::photo();
        let ops = vec![
            set(ParameterKey::Brightness, 0.1, 0.0),
            set(ParameterKey::Brightness, 0.15, 0.1),
            set(ParameterKey::Brightness, 0.2, 0.15),
        ];
        assert_eq!(optimize(&space, ops), vec![set(ParameterKey::Brightness, 0.2, 0.0)]);
    }

    #[test]
    fn disjoint_keys_keep_relative_order() {
        let space = ParameterSpace::photo();
        let ops = vec![
            set(ParameterKey::Contrast, 1.5, 1.0),
            set(ParameterKey::Brightness, 0.5, 0.0),
            set(ParameterKey::Contrast, 1.25, 1.5),
        ];
        assert_eq!(
            optimize(&space, ops),
            vec![
                set(ParameterKey::Contrast, 1.25, 1.0),
                set(ParameterKey::Brightness, 0.5, 0.0),
            ]
        );
    }

    #[test]
    fn preset_breaks_run_on_its_keys() {
        let space = ParameterSpace::photo();
        let state = space.default_state();
        let preset = Operation::preset(
            &state,
            "Warm",
            BTreeMap::from([(ParameterKey::Brightness, 0.25)]),
        );
        let ops = vec![
            set(ParameterKey::Brightness, 0.5, 0.0),
            preset,
            set(ParameterKey::Brightness, 0.75, 0.25),
        ];
        assert_eq!(optimize(&space, ops.clone()), ops);
    }

    #[test]
    fn adjust_after_adjust_is_not_folded() {
        let space = ParameterSpace::photo();
        let ops = vec![
            Operation::AdjustValue {
                key: ParameterKey::Exposure,
                delta: 0.5,
                old_delta: -0.5,
            },
            Operation::AdjustValue {
                key: ParameterKey::Exposure,
                delta: 0.5,
                old_delta: -0.5,
            },
        ];
        assert_eq!(optimize(&space, ops.clone()), ops);
    }

    #[test]
    fn set_then_adjust_folds_to_clamped_set() {
        let space = ParameterSpace::photo();
        let ops = vec![
            set(ParameterKey::Brightness, 0.75, 0.0),
            Operation::AdjustValue {
                key: ParameterKey::Brightness,
                delta: 0.5,
                old_delta: -0.25,
            },
        ];
        assert_eq!(optimize(&space, ops), vec![set(ParameterKey::Brightness, 1.0, 0.0)]);
    }

    #[test]
    fn set_after_adjust_chain_collapses_whole_run() {
        let space = ParameterSpace::photo();
        let adjust = Operation::AdjustValue {
            key: ParameterKey::Exposure,
            delta: 0.5,
            old_delta: -0.5,
        };
        let ops = vec![
            adjust.clone(),
            set(ParameterKey::Brightness, 0.5, 0.0),
            adjust,
            set(ParameterKey::Exposure, 2.0, 1.0),
        ];
        let once = optimize(&space, ops);
        assert_eq!(
            once,
            vec![
                set(ParameterKey::Exposure, 2.0, 0.0),
                set(ParameterKey::Brightness, 0.5, 0.0),
            ]
        );
        assert_eq!(optimize(&space, once.clone()), once);
    }

    #[test]
    fn empty_input_is_returned_unchanged() {
        let space = ParameterSpace::photo();
        assert!(optimize(&space, Vec::new()).is_empty());
    }
}
