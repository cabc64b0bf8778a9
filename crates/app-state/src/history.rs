//! Snapshot-based undo/redo history.
//!
//! Two stacks of full document snapshots:
//! - `past` holds the document as it was *before* each recorded command
//! - `future` holds documents that were undone, next redo last
//! - Recording a new entry clears `future` (no branching history)
//! - The oldest entries are dropped once `capacity` is exceeded
//!
//! Snapshots are `Arc<TimelineDocument>`; documents are never mutated in
//! place, so entries can share structure with the live document safely.
//!
//! # Debounced recording
//!
//! Rapid commands (dragging a clip, nudging with arrow keys) should form one
//! undo step. `push_debounced` starts a burst holding the snapshot from its
//! *first* command; every later command in the burst only restarts the
//! quiet-period timer. The burst is committed by `poll` once the timer
//! expires, or early by `flush_pending`. An immediate `push`, `undo`, or
//! `redo` commits a pending burst first, so the burst remains its own step.
//!
//! # Usage
//!
//! ```ignore
//! let mut history = HistoryManager::new(100, Duration::from_millis(300));
//!
//! // Before applying a command, record the current document
//! history.push("Split clip", "split_item", Arc::clone(&doc));
//! doc = new_doc;
//!
//! // Undo hands back the snapshot and keeps `doc` for redo
//! if let Some(prev) = history.undo(Arc::clone(&doc)) {
//!     doc = prev;
//! }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use sp_common::new_id;
use sp_timeline::TimelineDocument;

use crate::debounce::Debouncer;

/// A single entry in the undo/redo history.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub id: String,
    /// Human-readable label describing the action (e.g., "Move clip", "Delete track").
    pub label: String,
    /// Discriminant of the command that produced this entry.
    pub command_type: String,
    /// The document at this point in history.
    pub snapshot: Arc<TimelineDocument>,
    /// When this entry was created.
    pub timestamp: Instant,
}

impl HistoryEntry {
    fn new(label: &str, command_type: &str, snapshot: Arc<TimelineDocument>) -> Self {
        Self {
            id: new_id("hist"),
            label: label.to_string(),
            command_type: command_type.to_string(),
            snapshot,
            timestamp: Instant::now(),
        }
    }
}

/// Debounce key for the single history burst.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct Burst;

/// Manages undo/redo history using document snapshots.
pub struct HistoryManager {
    past: Vec<HistoryEntry>,
    future: Vec<HistoryEntry>,
    capacity: usize,
    debounce: Duration,
    burst: Debouncer<Burst, HistoryEntry>,
}

impl HistoryManager {
    /// Create a history keeping at most `capacity` undo entries, with
    /// `debounce` as the quiet period that closes a burst.
    pub fn new(capacity: usize, debounce: Duration) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            capacity,
            debounce,
            burst: Debouncer::new(),
        }
    }

    /// Record `snapshot` (the document before the command) as an undo step.
    ///
    /// Commits any pending debounced burst first and clears the redo stack.
    pub fn push(&mut self, label: &str, command_type: &str, snapshot: Arc<TimelineDocument>) {
        self.flush_pending();
        self.commit(HistoryEntry::new(label, command_type, snapshot));
    }

    /// Record a command issued in debounced mode.
    ///
    /// The first command of a burst supplies the snapshot; later ones only
    /// restart the timer. The redo stack is cleared straight away because
    /// the document has already diverged from it.
    pub fn push_debounced(
        &mut self,
        label: &str,
        command_type: &str,
        snapshot: Arc<TimelineDocument>,
        now: Duration,
    ) {
        self.future.clear();
        if self.burst.reset(&Burst, self.debounce, now) {
            tracing::debug!(label, "History burst extended");
            return;
        }
        self.burst.schedule(
            Burst,
            self.debounce,
            HistoryEntry::new(label, command_type, snapshot),
            now,
        );
        tracing::debug!(label, "History burst started");
    }

    /// Commit the pending burst if its quiet period has elapsed.
    /// Returns true if an entry was committed.
    pub fn poll(&mut self, now: Duration) -> bool {
        let due = self.burst.take_due(now);
        let committed = !due.is_empty();
        for (_, entry) in due {
            self.commit(entry);
        }
        committed
    }

    /// Commit the pending burst now, whatever its deadline.
    pub fn flush_pending(&mut self) -> bool {
        match self.burst.flush(&Burst) {
            Some(entry) => {
                self.commit(entry);
                true
            }
            None => false,
        }
    }

    /// Drop a pending burst without recording it.
    pub fn cancel_pending(&mut self) -> bool {
        self.burst.cancel(&Burst).is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.burst.is_pending(&Burst)
    }

    /// Deadline of the pending burst, if any.
    pub fn pending_deadline(&self) -> Option<Duration> {
        self.burst.next_deadline()
    }

    fn commit(&mut self, entry: HistoryEntry) {
        self.future.clear();
        let label = entry.label.clone();
        self.past.push(entry);
        self.enforce_capacity();

        tracing::debug!(
            label = %label,
            undo_depth = self.past.len(),
            "History entry pushed"
        );
    }

    fn enforce_capacity(&mut self) {
        if self.past.len() > self.capacity {
            let excess = self.past.len() - self.capacity;
            self.past.drain(..excess);
        }
    }

    /// Undo the last recorded command.
    ///
    /// `current` is the live document; it is kept on the redo stack so
    /// `redo` can return to it. Returns the document to restore, or `None`
    /// if there is nothing to undo (in which case `current` is dropped).
    pub fn undo(&mut self, current: Arc<TimelineDocument>) -> Option<Arc<TimelineDocument>> {
        self.flush_pending();
        let entry = self.past.pop()?;

        tracing::debug!(
            label = %entry.label,
            undo_remaining = self.past.len(),
            "Undo"
        );

        let restored = Arc::clone(&entry.snapshot);
        self.future.push(HistoryEntry {
            snapshot: current,
            timestamp: Instant::now(),
            ..entry
        });
        Some(restored)
    }

    /// Redo the last undone command. Mirror image of [`undo`](Self::undo).
    pub fn redo(&mut self, current: Arc<TimelineDocument>) -> Option<Arc<TimelineDocument>> {
        self.flush_pending();
        let entry = self.future.pop()?;

        tracing::debug!(
            label = %entry.label,
            redo_remaining = self.future.len(),
            "Redo"
        );

        let restored = Arc::clone(&entry.snapshot);
        self.past.push(HistoryEntry {
            snapshot: current,
            timestamp: Instant::now(),
            ..entry
        });
        self.enforce_capacity();
        Some(restored)
    }

    /// Whether undo would do anything, counting a pending burst.
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty() || self.has_pending()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Get the label of the action that would be undone next.
    pub fn undo_label(&self) -> Option<&str> {
        self.burst
            .get(&Burst)
            .or_else(|| self.past.last())
            .map(|e| e.label.as_str())
    }

    /// Get the label of the action that would be redone next.
    pub fn redo_label(&self) -> Option<&str> {
        self.future.last().map(|e| e.label.as_str())
    }

    /// Number of committed entries on the undo stack.
    pub fn undo_count(&self) -> usize {
        self.past.len()
    }

    pub fn redo_count(&self) -> usize {
        self.future.len()
    }

    /// Committed undo entries, oldest first.
    pub fn past(&self) -> &[HistoryEntry] {
        &self.past
    }

    /// Undone entries, next redo last.
    pub fn future(&self) -> &[HistoryEntry] {
        &self.future
    }

    /// Clear all history, including a pending burst. Called on load/reset.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.burst.cancel(&Burst);
        tracing::debug!("History cleared");
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity. Trims the oldest entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.enforce_capacity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    /// Create a minimal test document with an identifying name.
    fn make_snapshot(tag: &str) -> Arc<TimelineDocument> {
        Arc::new(TimelineDocument::fallback("doc", format!("Doc {tag}"), 30.0))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn name(doc: Option<Arc<TimelineDocument>>) -> String {
        doc.map(|d| d.name.clone()).unwrap_or_default()
    }

    #[test]
    fn new_history_is_empty() {
        let h = HistoryManager::new(100, DEBOUNCE);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert_eq!(h.undo_count(), 0);
        assert!(h.undo_label().is_none());
        assert!(h.redo_label().is_none());
    }

    #[test]
    fn push_undo_redo_symmetry() {
        let mut h = HistoryManager::new(100, DEBOUNCE);
        h.push("Action A", "a", make_snapshot("a"));
        h.push("Action B", "b", make_snapshot("b"));

        assert_eq!(name(h.undo(make_snapshot("current"))), "Doc b");
        assert_eq!(h.redo_label(), Some("Action B"));
        assert_eq!(name(h.redo(make_snapshot("b"))), "Doc current");
        assert_eq!(h.undo_count(), 2);
        assert_eq!(h.redo_count(), 0);
    }

    #[test]
    fn undo_then_redo_returns_the_same_arc() {
        let mut h = HistoryManager::new(100, DEBOUNCE);
        let before = make_snapshot("before");
        let after = make_snapshot("after");
        h.push("Edit", "edit", Arc::clone(&before));

        let undone = h.undo(Arc::clone(&after)).expect("undo");
        assert!(Arc::ptr_eq(&undone, &before));
        let redone = h.redo(undone).expect("redo");
        assert!(Arc::ptr_eq(&redone, &after));
    }

    #[test]
    fn undo_and_redo_on_empty_stacks() {
        let mut h = HistoryManager::new(100, DEBOUNCE);
        assert!(h.undo(make_snapshot("x")).is_none());
        assert!(h.redo(make_snapshot("x")).is_none());
    }

    #[test]
    fn push_clears_redo_stack() {
        let mut h = HistoryManager::new(100, DEBOUNCE);
        h.push("A", "a", make_snapshot("a"));
        h.push("B", "b", make_snapshot("b"));
        h.undo(make_snapshot("c"));
        assert!(h.can_redo());

        h.push("C", "c", make_snapshot("c"));
        assert!(!h.can_redo());
        assert_eq!(h.undo_count(), 2);
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut h = HistoryManager::new(3, DEBOUNCE);
        for tag in ["a", "b", "c", "d"] {
            h.push(tag, tag, make_snapshot(tag));
        }
        assert_eq!(h.undo_count(), 3);
        assert_eq!(h.past()[0].label, "b");

        h.set_capacity(1);
        assert_eq!(h.undo_count(), 1);
        assert_eq!(h.undo_label(), Some("d"));
    }

    #[test]
    fn burst_keeps_first_snapshot() {
        let mut h = HistoryManager::new(100, DEBOUNCE);
        h.push_debounced("Move clip", "move_item", make_snapshot("first"), ms(0));
        h.push_debounced("Move clip", "move_item", make_snapshot("second"), ms(100));
        h.push_debounced("Move clip", "move_item", make_snapshot("third"), ms(200));
        assert_eq!(h.undo_count(), 0);
        assert!(h.has_pending());

        // Timer restarted at 200ms, so nothing is due at 450ms.
        assert!(!h.poll(ms(450)));
        assert!(h.poll(ms(500)));
        assert_eq!(h.undo_count(), 1);
        assert_eq!(name(h.undo(make_snapshot("now"))), "Doc first");
    }

    #[test]
    fn immediate_push_commits_pending_burst_first() {
        let mut h = HistoryManager::new(100, DEBOUNCE);
        h.push_debounced("Nudge", "move_item", make_snapshot("nudge"), ms(0));
        h.push("Delete clips", "delete_items", make_snapshot("delete"));
        assert!(!h.has_pending());
        assert_eq!(h.undo_count(), 2);
        assert_eq!(h.past()[0].label, "Nudge");
        assert_eq!(h.past()[1].label, "Delete clips");
    }

    #[test]
    fn undo_commits_pending_burst() {
        let mut h = HistoryManager::new(100, DEBOUNCE);
        h.push("A", "a", make_snapshot("a"));
        h.push_debounced("Trim", "trim_item", make_snapshot("pre-trim"), ms(0));
        assert!(h.can_undo());
        assert_eq!(h.undo_label(), Some("Trim"));
        assert_eq!(name(h.undo(make_snapshot("live"))), "Doc pre-trim");
        assert_eq!(h.undo_count(), 1);
    }

    #[test]
    fn debounced_push_clears_redo() {
        let mut h = HistoryManager::new(100, DEBOUNCE);
        h.push("A", "a", make_snapshot("a"));
        h.undo(make_snapshot("b"));
        h.push_debounced("Drag", "move_item", make_snapshot("c"), ms(0));
        assert!(!h.can_redo());
    }

    #[test]
    fn clear_drops_pending_burst() {
        let mut h = HistoryManager::new(100, DEBOUNCE);
        h.push("A", "a", make_snapshot("a"));
        h.push_debounced("Drag", "move_item", make_snapshot("b"), ms(0));
        h.clear();
        assert!(!h.can_undo());
        assert!(!h.poll(ms(10_000)));
    }

    #[test]
    fn entries_keep_command_type() {
        let mut h = HistoryManager::new(100, DEBOUNCE);
        h.push("Split clip", "split_item", make_snapshot("a"));
        let entry = &h.past()[0];
        assert_eq!(entry.command_type, "split_item");
        assert!(entry.id.starts_with("hist_"));
    }
}
