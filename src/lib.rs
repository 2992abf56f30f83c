//! Delta-based edit history for photo adjustment parameters.
//!
//! # Examples
//!
//! In-memory usage with [`core::history::HistoryEngine`]:
//! ```
//! use adjustlog::{
//!     core::history::HistoryEngine,
//!     space::ParameterSpace,
//!     types::ParameterKey,
//! };
//!
//! let space = ParameterSpace::photo();
//! let mut history = HistoryEngine::new(space.clone());
//!
//! let before = space.default_state();
//! let after = before.with(ParameterKey::Brightness, 0.25);
//! assert!(history.save_state_changes(&before, &after, "Brightness"));
//! assert_eq!(history.current_state(), after);
//!
//! let undone = history.undo().expect("undo");
//! assert_eq!(undone, before);
//! assert!(history.can_redo());
//! ```
//!
//! Runtime usage with a single-writer task:
//! ```no_run
//! use adjustlog::{
//!     core::history::HistoryEngine,
//!     runtime::handle::{spawn_history, RuntimeConfig},
//!     space::ParameterSpace,
//!     types::ParameterKey,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let space = ParameterSpace::photo();
//! let handle = spawn_history(HistoryEngine::new(space.clone()), None, RuntimeConfig::default());
//! let before = space.default_state();
//! let after = before.with(ParameterKey::Contrast, 1.5);
//! handle.save_state_changes(before, after, "Contrast").await.expect("save");
//! let state = handle.undo().await.expect("undo");
//! assert_eq!(state, before);
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![warn(missing_docs)]

/// Edit-history engine and operation batching.
pub mod core;
/// Reversible operations and state diffing.
pub mod op;
/// Renderer seam.
pub mod render;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Parameter defaults and ranges.
pub mod space;
/// Parameter state values and persisted envelope.
pub mod state;
/// Shared primitive types and enums.
pub mod types;
