//! Derived editor state.
//!
//! `EditorState` holds everything the UI shows next to the document itself:
//! the timeline duration, playhead, selection, and save bookkeeping. It is
//! recomputed from the document with [`EditorState::refresh`] after every
//! change and never feeds back into the document except for the playhead,
//! which the session stores in document metadata on save.

use serde::{Deserialize, Serialize};
use sp_timeline::{total_duration_us, TimelineDocument};

use crate::selection::SelectionState;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    /// End of the last item on any track.
    pub duration_us: i64,
    pub playhead_us: i64,
    pub selection: SelectionState,
    /// Bumped on every document change.
    pub dirty_revision: u64,
    /// `dirty_revision` as of the last successful save.
    pub saved_revision: u64,
    /// Message of the most recent failed save, cleared by the next success.
    pub last_save_error: Option<String>,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether there are changes not yet written.
    pub fn is_dirty(&self) -> bool {
        self.dirty_revision != self.saved_revision
    }

    /// Record a document change. Returns the new revision.
    pub fn mark_dirty(&mut self) -> u64 {
        self.dirty_revision += 1;
        tracing::trace!(revision = self.dirty_revision, "Document marked dirty");
        self.dirty_revision
    }

    /// Record a successful save of `revision`.
    ///
    /// A save that finishes after newer edits leaves the state dirty.
    pub fn mark_saved(&mut self, revision: u64) {
        if revision > self.saved_revision {
            self.saved_revision = revision;
        }
        self.last_save_error = None;
    }

    pub fn record_save_error(&mut self, message: impl Into<String>) {
        self.last_save_error = Some(message.into());
    }

    /// Move the playhead. Negative times clamp to zero.
    /// Returns true if it moved.
    pub fn set_playhead(&mut self, playhead_us: i64) -> bool {
        let playhead_us = playhead_us.max(0);
        if playhead_us == self.playhead_us {
            return false;
        }
        self.playhead_us = playhead_us;
        true
    }

    /// Recompute derived fields from `doc` and prune a stale selection.
    /// Returns true if the selection changed.
    pub fn refresh(&mut self, doc: &TimelineDocument) -> bool {
        self.duration_us = total_duration_us(doc);
        self.selection.prune(doc)
    }

    /// Reset for a freshly loaded document: clean revisions, empty selection,
    /// playhead restored from metadata and clamped into `[0, duration]`.
    pub fn reset_for(&mut self, doc: &TimelineDocument) {
        self.duration_us = total_duration_us(doc);
        self.selection.clear();
        self.dirty_revision = 0;
        self.saved_revision = 0;
        self.last_save_error = None;
        self.playhead_us = doc
            .metadata
            .playhead_us
            .unwrap_or(0)
            .clamp(0, self.duration_us.max(0));
    }
}
