//! `sp-app-state` -- Editor state management for the Splice editor core.
//!
//! This crate provides:
//!
//! - **`HistoryManager`**: Snapshot-based undo/redo with debounced burst recording.
//! - **`Debouncer`**: Keyed "last write wins" timers, polled rather than spawned.
//! - **`Clock`**: Monotonic time source (`MonotonicClock`, `ManualClock` for tests).
//! - **`SelectionState`**: Item and track selection with pruning against the document.
//! - **`EditorState`**: Derived duration, playhead, selection, and save bookkeeping.
//!
//! # Architecture
//!
//! ```text
//! HistoryManager
//! ├── past: Vec<HistoryEntry>         (snapshots before each command)
//! ├── future: Vec<HistoryEntry>       (undone documents)
//! └── burst: Debouncer<_, HistoryEntry> (pending debounced entry)
//!
//! EditorState
//! ├── duration_us / playhead_us
//! ├── selection: SelectionState
//! └── dirty_revision / saved_revision / last_save_error
//! ```

pub mod clock;
pub mod debounce;
pub mod history;
pub mod selection;
pub mod state;

// Re-export primary types at crate root for convenience.
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use debounce::Debouncer;
pub use history::{HistoryEntry, HistoryManager};
pub use selection::{ItemRef, SelectionState};
pub use state::EditorState;
