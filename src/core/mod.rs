//! Edit-history engine: operation optimizer, deltas, and the undo/redo log.

/// History log, merge heuristic, compaction, and replay cache.
pub mod history;
/// Same-key operation folding.
pub mod optimize;
/// Operation sequences and deltas.
pub mod sequence;
