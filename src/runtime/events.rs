//! Runtime event stream payloads.

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// A delta was recorded.
    Saved {
        /// Log length after the save.
        entries: usize,
        /// True when the delta was merged into the previous entry.
        merged: bool,
    },
    /// A save was skipped because nothing changed.
    Skipped,
    /// One undo step was applied.
    UndoApplied {
        /// Cursor after the undo.
        cursor: isize,
    },
    /// One redo step was applied.
    RedoApplied {
        /// Cursor after the redo.
        cursor: isize,
    },
    /// History was cleared.
    Reset,
}
