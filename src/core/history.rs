use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{
    core::{
        optimize::optimize,
        sequence::{Delta, OperationSequence},
    },
    op::diff,
    space::ParameterSpace,
    state::ParameterState,
};

/// Label prefix given to merged deltas.
pub const MERGE_LABEL_PREFIX: &str = "병합: ";

/// No-op outcomes of history commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// Cursor is already before the first delta.
    #[error("nothing to undo")]
    NothingToUndo,
    /// Cursor is already at the newest delta.
    #[error("nothing to redo")]
    NothingToRedo,
    /// A sequence was built from zero operations.
    #[error("operation sequence is empty")]
    EmptySequence,
}

/// Capacity and merge policy for [`HistoryEngine`].
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Log length bound enforced after every save; zero is treated as one.
    pub max_entries: usize,
    /// Compaction runs when the log grows past this length.
    pub compaction_threshold: usize,
    /// Maximum number of followers merged into one delta during compaction.
    pub merge_chain_cap: usize,
    /// Deltas with more operations than this are never merged.
    pub max_mergeable_ops: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            compaction_threshold: 10,
            merge_chain_cap: 3,
            max_mergeable_ops: 2,
        }
    }
}

/// Point-in-time counters for diagnostics and UI state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStats {
    /// Entries in the log.
    pub entries: usize,
    /// Index of the newest applied entry, -1 when none is.
    pub cursor: isize,
    /// Whether an undo would succeed.
    pub can_undo: bool,
    /// Whether a redo would succeed.
    pub can_redo: bool,
    /// Successful undos since creation.
    pub undo_count: u64,
    /// Successful redos since creation.
    pub redo_count: u64,
    /// Saves folded into the tail entry instead of appended.
    pub merge_count: u64,
    /// Entries dropped from the head to respect `max_entries`.
    pub evicted_count: u64,
    /// Compaction passes that removed at least one entry.
    pub compaction_count: u64,
    /// Sum of [`Delta::estimated_cost`] over the log.
    pub estimated_cost: usize,
}

/// Merges two adjacent deltas when doing so strictly reduces operation count.
///
/// Both deltas must share a key and hold at most `max_ops` operations each.
pub fn try_merge(space: &ParameterSpace, a: &Delta, b: &Delta, max_ops: usize) -> Option<Delta> {
    if a.len() > max_ops || b.len() > max_ops {
        return None;
    }
    if a.affected_keys().is_disjoint(&b.affected_keys()) {
        return None;
    }

    let combined: Vec<_> = a.operations().iter().chain(b.operations()).cloned().collect();
    let combined_len = combined.len();
    let optimized = optimize(space, combined);
    if optimized.len() >= combined_len {
        return None;
    }

    let label = format!("{MERGE_LABEL_PREFIX}{} + {}", a.label, b.label);
    OperationSequence::new(optimized, label).ok().map(Delta::new)
}

/// Delta-based undo/redo log with a replay cache.
///
/// `cursor` is `-1` before the first delta; the current state is the replay of
/// `deltas[..=cursor]` over the space's default state.
#[derive(Debug)]
pub struct HistoryEngine {
    space: ParameterSpace,
    config: HistoryConfig,
    deltas: Vec<Delta>,
    cursor: isize,
    cache: Option<(isize, ParameterState)>,
    undo_count: u64,
    redo_count: u64,
    merge_count: u64,
    evicted_count: u64,
    compaction_count: u64,
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new(ParameterSpace::photo())
    }
}

impl HistoryEngine {
    /// Empty history over `space` with the default policy.
    pub fn new(space: ParameterSpace) -> Self {
        Self::with_config(space, HistoryConfig::default())
    }

    /// Empty history over `space` with an explicit policy.
    pub fn with_config(space: ParameterSpace, config: HistoryConfig) -> Self {
        Self {
            space,
            config,
            deltas: Vec::new(),
            cursor: -1,
            cache: None,
            undo_count: 0,
            redo_count: 0,
            merge_count: 0,
            evicted_count: 0,
            compaction_count: 0,
        }
    }

    /// Parameter space the log replays against.
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Active history policy.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// All entries, oldest first, including any redo tail.
    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    /// Number of entries, including any redo tail.
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Index of the newest applied entry; -1 means the defaults.
    pub fn cursor(&self) -> isize {
        self.cursor
    }

    /// Whether some entry is applied.
    pub fn can_undo(&self) -> bool {
        self.cursor >= 0
    }

    /// Whether an entry lies past the cursor.
    pub fn can_redo(&self) -> bool {
        self.cursor < self.last_index()
    }

    /// Label of the entry the next undo reverts.
    pub fn undo_label(&self) -> Option<&str> {
        self.delta_at(self.cursor).map(|d| d.label.as_str())
    }

    /// Label of the entry the next redo reapplies.
    pub fn redo_label(&self) -> Option<&str> {
        self.delta_at(self.cursor + 1).map(|d| d.label.as_str())
    }

    /// Entry labels, oldest first.
    pub fn labels(&self) -> Vec<&str> {
        self.deltas.iter().map(|d| d.label.as_str()).collect()
    }

    /// Snapshot of counters and log shape.
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            entries: self.deltas.len(),
            cursor: self.cursor,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            undo_count: self.undo_count,
            redo_count: self.redo_count,
            merge_count: self.merge_count,
            evicted_count: self.evicted_count,
            compaction_count: self.compaction_count,
            estimated_cost: self.deltas.iter().map(Delta::estimated_cost).sum(),
        }
    }

    /// Diffs `old` against `new` and saves the result.
    ///
    /// Returns false without touching history when the states are equal.
    pub fn save_state_changes(
        &mut self,
        old: &ParameterState,
        new: &ParameterState,
        label: impl Into<String>,
    ) -> bool {
        let label = label.into();
        match Delta::from_operations(diff(old, new), label.as_str()) {
            Ok(delta) => {
                self.save(delta);
                true
            }
            Err(_) => {
                warn!(label = %label, "save skipped: no parameter changed");
                false
            }
        }
    }

    /// Records `delta` as the newest edit.
    ///
    /// Discards any redo tail, merges into the tail entry when possible, then
    /// evicts and compacts to keep the log bounded.
    pub fn save(&mut self, delta: Delta) {
        self.truncate_redo_tail();

        let merged = self
            .deltas
            .last()
            .and_then(|tail| try_merge(&self.space, tail, &delta, self.config.max_mergeable_ops));

        match merged {
            Some(merged) => {
                debug!(label = %merged.label, ops = merged.len(), "merged into tail");
                let tail = self.deltas.len() - 1;
                self.deltas[tail] = merged;
                self.merge_count += 1;
            }
            None => {
                debug!(label = %delta.label, ops = delta.len(), "appended");
                self.deltas.push(delta);
                self.cursor += 1;
            }
        }

        self.evict_overflow();
        if self.deltas.len() > self.config.compaction_threshold {
            self.compress();
        }
        self.cache = None;
        self.check_invariants();
    }

    /// Moves the cursor back one entry and returns the resulting state.
    pub fn undo(&mut self) -> Result<ParameterState, HistoryError> {
        if self.cursor < 0 {
            return Err(HistoryError::NothingToUndo);
        }
        self.cursor -= 1;
        self.undo_count += 1;
        self.cache = None;
        debug!(cursor = self.cursor, "undo");
        Ok(self.current_state())
    }

    /// Moves the cursor forward one entry and returns the resulting state.
    pub fn redo(&mut self) -> Result<ParameterState, HistoryError> {
        if self.cursor >= self.last_index() {
            return Err(HistoryError::NothingToRedo);
        }
        self.cursor += 1;
        self.redo_count += 1;
        self.cache = None;
        debug!(cursor = self.cursor, "redo");
        Ok(self.current_state())
    }

    /// Clears the log back to the all-defaults state.
    pub fn reset(&mut self) {
        self.deltas.clear();
        self.cursor = -1;
        self.cache = None;
        debug!("history reset");
    }

    /// State at the cursor, served from cache when the cursor has not moved.
    pub fn current_state(&mut self) -> ParameterState {
        if let Some((index, state)) = &self.cache {
            if *index == self.cursor {
                trace!(cursor = self.cursor, "replay cache hit");
                return *state;
            }
        }

        // TODO: replay forward from the cached index instead of from defaults
        // when the cursor only advanced.
        let state = self.replay();
        self.cache = Some((self.cursor, state));
        state
    }

    /// Replays `deltas[..=cursor]` from defaults, bypassing the cache.
    pub fn replay(&self) -> ParameterState {
        let end = (self.cursor + 1) as usize;
        self.deltas[..end]
            .iter()
            .fold(self.space.default_state(), |state, delta| delta.apply_to(&self.space, state))
    }

    /// Whether the cached state matches the cursor.
    pub fn is_cache_warm(&self) -> bool {
        matches!(self.cache, Some((index, _)) if index == self.cursor)
    }

    /// Greedily merges runs of up to `merge_chain_cap + 1` adjacent deltas.
    ///
    /// Only `deltas[..=cursor]` is compacted; a redo tail is left intact.
    /// Returns the number of entries removed.
    pub fn compress(&mut self) -> usize {
        if self.cursor < 1 {
            return 0;
        }

        let tail = self.deltas.split_off((self.cursor + 1) as usize);
        let prefix = std::mem::take(&mut self.deltas);
        let before = prefix.len();

        let mut compacted = Vec::with_capacity(before);
        let mut iter = prefix.into_iter().peekable();
        while let Some(mut current) = iter.next() {
            let mut chained = 0;
            while chained < self.config.merge_chain_cap {
                let Some(next) = iter.peek() else { break };
                let Some(merged) = try_merge(&self.space, &current, next, self.config.max_mergeable_ops) else {
                    break;
                };
                current = merged;
                iter.next();
                chained += 1;
            }
            compacted.push(current);
        }

        let removed = before - compacted.len();
        self.cursor = compacted.len() as isize - 1;
        self.deltas = compacted;
        self.deltas.extend(tail);
        self.cache = None;

        if removed > 0 {
            self.compaction_count += 1;
            debug!(removed, entries = self.deltas.len(), "compacted history");
        }
        self.check_invariants();
        removed
    }

    fn truncate_redo_tail(&mut self) {
        if self.can_redo() {
            let keep = (self.cursor + 1) as usize;
            debug!(dropped = self.deltas.len() - keep, "discarding redo tail");
            self.deltas.truncate(keep);
        }
    }

    fn evict_overflow(&mut self) {
        let max = self.config.max_entries.max(1);
        if self.deltas.len() <= max {
            return;
        }
        let overflow = self.deltas.len() - max;
        self.deltas.drain(..overflow);
        self.cursor = (self.cursor - overflow as isize).max(-1);
        self.evicted_count += overflow as u64;
        debug!(evicted = overflow, "evicted oldest history entries");
    }

    fn last_index(&self) -> isize {
        self.deltas.len() as isize - 1
    }

    fn delta_at(&self, index: isize) -> Option<&Delta> {
        usize::try_from(index).ok().and_then(|i| self.deltas.get(i))
    }

    fn check_invariants(&self) {
        debug_assert!(self.cursor >= -1 && self.cursor <= self.last_index());
        debug_assert!(self.deltas.len() <= self.config.max_entries.max(1));
        debug_assert!(self.cache.is_none() || self.is_cache_warm());
    }
}
