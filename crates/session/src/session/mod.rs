//! The edit session: owner of the live document.
//!
//! Every change funnels through [`EditSession::apply_timeline`] (or a
//! composite edit built on a [`Draft`]): the command engine produces the
//! next document, the history records the previous one, derived state is
//! refreshed, observers are notified and a save is scheduled.
//!
//! Timers are polled, not spawned: call [`EditSession::tick`] regularly
//! (once per UI frame is plenty) and [`EditSession::flush`] before exit.

mod edits;

pub use edits::{JumpDirection, TrimSide};

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Receiver;
use sp_app_state::{Clock, Debouncer, EditorState, HistoryManager, SelectionState};
use sp_common::{quantize_time_us_to_frames, EditorConfig, QuantizeMode};
use sp_project::{fallback_document, parse, serialize, DocumentDefaults};
use sp_timeline::{
    apply_all, apply_with_options, ApplyOptions, TimelineCommand, TimelineDocument,
};
use tracing::{debug, error, info, warn};

use crate::error::SessionResult;
use crate::events::{EventBus, SessionEvent};
use crate::metadata::MetadataResolver;
use crate::persist::{WriteJob, WriteOutcome, WriteQueue};
use crate::storage::Storage;

/// When the change is written.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SaveMode {
    /// After the save quiet period, coalesced with later changes.
    #[default]
    Debounced,
    Immediate,
    Skip,
}

/// How the change is recorded for undo.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HistoryMode {
    /// Its own undo step.
    #[default]
    Immediate,
    /// Coalesced with the other changes of the same burst.
    Debounced,
    Skip,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyMode {
    pub save: SaveMode,
    pub history: HistoryMode,
}

impl ApplyMode {
    /// Undo step and write right away.
    pub fn immediate() -> Self {
        Self {
            save: SaveMode::Immediate,
            history: HistoryMode::Immediate,
        }
    }

    /// Continuous gestures such as drags: one undo step and one write per burst.
    pub fn continuous() -> Self {
        Self {
            save: SaveMode::Debounced,
            history: HistoryMode::Debounced,
        }
    }

    /// Persisted but not undoable.
    pub fn silent() -> Self {
        Self {
            save: SaveMode::Debounced,
            history: HistoryMode::Skip,
        }
    }
}

/// Where the session keeps its document and how it behaves.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub config: EditorConfig,
    /// Project-relative path of the timeline file.
    pub timeline_path: String,
    /// Identity of the document used when the file is missing or unreadable.
    pub defaults: DocumentDefaults,
}

impl SessionOptions {
    pub fn new(timeline_path: impl Into<String>, defaults: DocumentDefaults) -> Self {
        Self {
            config: EditorConfig::default(),
            timeline_path: timeline_path.into(),
            defaults,
        }
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }
}

/// Issued by [`EditSession::begin_load`]. Only the newest ticket can
/// complete a load.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    id: u64,
}

impl LoadTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct PendingSave;

/// A working copy that several commands are applied to before it is
/// committed as a single change.
pub(crate) struct Draft {
    doc: Arc<TimelineDocument>,
    opts: ApplyOptions,
}

impl Draft {
    pub(crate) fn apply(&mut self, command: TimelineCommand) -> SessionResult<bool> {
        let applied = apply_with_options(&self.doc, command, &self.opts)?;
        self.doc = applied.document;
        Ok(applied.changed)
    }

    pub(crate) fn document(&self) -> &TimelineDocument {
        &self.doc
    }
}

pub struct EditSession {
    storage: Arc<dyn Storage>,
    metadata: Arc<dyn MetadataResolver>,
    clock: Arc<dyn Clock>,
    config: EditorConfig,
    timeline_path: String,
    defaults: DocumentDefaults,

    document: Arc<TimelineDocument>,
    history: HistoryManager,
    state: EditorState,
    load_request_id: u64,

    save_timer: Debouncer<PendingSave, ()>,
    writes: WriteQueue,
    events: EventBus,
}

impl EditSession {
    /// A session holding the fallback document. Call [`load`](Self::load)
    /// to read the timeline file.
    pub fn new(
        storage: Arc<dyn Storage>,
        metadata: Arc<dyn MetadataResolver>,
        clock: Arc<dyn Clock>,
        options: SessionOptions,
    ) -> Self {
        let SessionOptions {
            config,
            timeline_path,
            defaults,
        } = options;
        let document = Arc::new(fallback_document(&defaults));
        let mut state = EditorState::new();
        state.reset_for(&document);

        Self {
            history: HistoryManager::new(
                config.history_capacity,
                Duration::from_millis(config.history_debounce_ms),
            ),
            storage,
            metadata,
            clock,
            config,
            timeline_path,
            defaults,
            document,
            state,
            load_request_id: 0,
            save_timer: Debouncer::new(),
            writes: WriteQueue::new(),
            events: EventBus::new(),
        }
    }

    // -- Accessors ---------------------------------------------------------

    pub fn document(&self) -> &Arc<TimelineDocument> {
        &self.document
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn selection(&self) -> &SelectionState {
        &self.state.selection
    }

    pub fn playhead_us(&self) -> i64 {
        self.state.playhead_us
    }

    pub fn duration_us(&self) -> i64 {
        self.state.duration_us
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn timeline_path(&self) -> &str {
        &self.timeline_path
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // -- Loading -----------------------------------------------------------

    /// Start a load. Any ticket issued earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.load_request_id += 1;
        debug!(request_id = self.load_request_id, "Load requested");
        LoadTicket {
            id: self.load_request_id,
        }
    }

    /// Read the timeline file's text; `None` when it does not exist yet.
    pub fn read_timeline_text(&self) -> SessionResult<Option<String>> {
        match self.storage.get_file_handle(&self.timeline_path, false)? {
            Some(handle) => Ok(Some(self.storage.read_text(&handle)?)),
            None => Ok(None),
        }
    }

    /// Complete a load with the text read for `ticket`. Returns false, and
    /// changes nothing, when a newer load has been started since.
    ///
    /// Missing or unreadable text yields the fallback document.
    pub fn finish_load(&mut self, ticket: LoadTicket, text: Option<&str>) -> bool {
        if ticket.id != self.load_request_id {
            warn!(
                ticket = ticket.id,
                current = self.load_request_id,
                "Discarding stale load"
            );
            return false;
        }
        let doc = match text {
            Some(text) => parse(text, &self.defaults),
            None => fallback_document(&self.defaults),
        };
        self.replace_document(doc);
        true
    }

    /// Load the timeline file, replacing the current document and clearing
    /// history. A read failure leaves the session untouched.
    pub fn load(&mut self) -> SessionResult<bool> {
        let ticket = self.begin_load();
        let text = self.read_timeline_text()?;
        Ok(self.finish_load(ticket, text.as_deref()))
    }

    /// Replace the document outright (new project, revert).
    pub fn reset(&mut self, doc: TimelineDocument) {
        self.replace_document(doc);
    }

    fn replace_document(&mut self, doc: TimelineDocument) {
        // Pending work belongs to the outgoing document.
        self.flush();
        self.history.clear();
        self.state.reset_for(&doc);
        self.document = Arc::new(doc);

        info!(
            document_id = %self.document.id,
            tracks = self.document.tracks.len(),
            duration_us = self.state.duration_us,
            "Document loaded"
        );
        self.events.emit(SessionEvent::DocumentLoaded {
            document_id: self.document.id.clone(),
        });
        self.emit_history();
        self.events.emit(SessionEvent::PlayheadMoved {
            playhead_us: self.state.playhead_us,
        });
    }

    // -- Applying commands -------------------------------------------------

    fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            overlap_policy: self.config.overlap_policy,
        }
    }

    /// Apply one command. Returns false when it changed nothing; a
    /// validation error leaves the session untouched.
    ///
    /// Commands without stream flags get them from the metadata resolver,
    /// and a trimmed clip is hydrated first so the trim clamps to the
    /// real source length.
    pub fn apply_timeline(&mut self, command: TimelineCommand, mode: ApplyMode) -> SessionResult<bool> {
        let command = self.with_source_info(command);
        let label = command.label();
        let command_type = command.command_type();
        let applied = apply_with_options(&self.document, command, &self.apply_options())?;
        if !applied.changed {
            debug!(command_type, "Command changed nothing");
            return Ok(false);
        }
        self.commit(applied.document, label, command_type, mode);
        Ok(true)
    }

    /// Apply several commands as one undo step. All or nothing.
    pub fn apply_sequence(
        &mut self,
        commands: Vec<TimelineCommand>,
        label: &str,
        mode: ApplyMode,
    ) -> SessionResult<bool> {
        let commands: Vec<TimelineCommand> = commands
            .into_iter()
            .map(|command| self.with_source_info(command))
            .collect();
        let applied = apply_all(&self.document, commands, &self.apply_options())?;
        if !applied.changed {
            return Ok(false);
        }
        self.commit(applied.document, label, "sequence", mode);
        Ok(true)
    }

    pub(crate) fn draft(&self) -> Draft {
        Draft {
            doc: Arc::clone(&self.document),
            opts: self.apply_options(),
        }
    }

    /// Commit a draft. Returns false if nothing in it changed.
    pub(crate) fn commit_draft(
        &mut self,
        draft: Draft,
        label: &str,
        command_type: &str,
        mode: ApplyMode,
    ) -> bool {
        if Arc::ptr_eq(&draft.doc, &self.document) {
            return false;
        }
        self.commit(draft.doc, label, command_type, mode);
        true
    }

    fn commit(&mut self, next: Arc<TimelineDocument>, label: &str, command_type: &str, mode: ApplyMode) {
        let previous = std::mem::replace(&mut self.document, next);
        match mode.history {
            HistoryMode::Immediate => self.history.push(label, command_type, previous),
            HistoryMode::Debounced => {
                let now = self.clock.now();
                self.history.push_debounced(label, command_type, previous, now);
            }
            HistoryMode::Skip => {}
        }
        debug!(
            command_type,
            label,
            undo_depth = self.history.undo_count(),
            "Command applied"
        );
        self.after_change(Some(command_type), mode.save);
    }

    fn after_change(&mut self, command_type: Option<&str>, save: SaveMode) {
        let revision = self.state.mark_dirty();
        let selection_changed = self.state.refresh(&self.document);
        self.events.emit(SessionEvent::DocumentChanged {
            revision,
            command_type: command_type.map(str::to_string),
        });
        if selection_changed {
            self.events.emit(SessionEvent::SelectionChanged);
        }
        self.emit_history();

        match save {
            SaveMode::Immediate => {
                self.save_now();
            }
            SaveMode::Debounced => self.schedule_save(),
            SaveMode::Skip => {}
        }
    }

    fn emit_history(&self) {
        self.events.emit(SessionEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    // -- Undo / redo -------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(Arc::clone(&self.document)) else {
            return false;
        };
        self.document = previous;
        debug!(undo_depth = self.history.undo_count(), "Undo");
        self.after_change(None, SaveMode::Debounced);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(Arc::clone(&self.document)) else {
            return false;
        };
        self.document = next;
        debug!(redo_depth = self.history.redo_count(), "Redo");
        self.after_change(None, SaveMode::Debounced);
        true
    }

    // -- Timers and persistence --------------------------------------------

    fn schedule_save(&mut self) {
        let delay = Duration::from_millis(self.config.save_debounce_ms);
        self.save_timer.schedule(PendingSave, delay, (), self.clock.now());
    }

    pub fn has_pending_save(&self) -> bool {
        self.save_timer.is_pending(&PendingSave)
    }

    /// Earliest moment [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.history.pending_deadline(), self.save_timer.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run whatever timers have expired.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        if self.history.poll(now) {
            self.emit_history();
        }
        if !self.save_timer.take_due(now).is_empty() {
            self.save_now();
        }
    }

    /// Commit a pending history burst and write a pending save now.
    pub fn flush(&mut self) {
        if self.history.flush_pending() {
            self.emit_history();
        }
        if self.save_timer.cancel(&PendingSave).is_some() {
            self.save_now();
        }
    }

    /// Serialize and write the document, playhead included.
    ///
    /// Returns false on failure; the message is kept in
    /// `state().last_save_error` and announced as `SaveFailed`.
    pub fn save_now(&mut self) -> bool {
        self.save_timer.cancel(&PendingSave);
        let revision = self.state.dirty_revision;

        let mut doc = (*self.document).clone();
        doc.metadata.playhead_us = Some(self.state.playhead_us);
        let text = match serialize(&doc) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to serialize timeline");
                self.record_save_failure(revision, e.to_string());
                return false;
            }
        };

        self.writes.enqueue(WriteJob {
            path: self.timeline_path.clone(),
            text,
            revision,
        });
        let mut all_written = true;
        for outcome in self.writes.drain(self.storage.as_ref()) {
            match outcome {
                WriteOutcome::Written { path, revision } => {
                    self.state.mark_saved(revision);
                    info!(path = %path, revision, "Timeline saved");
                    self.events.emit(SessionEvent::Saved { revision });
                }
                WriteOutcome::Failed { revision, error, .. } => {
                    all_written = false;
                    self.record_save_failure(revision, error);
                }
            }
        }
        all_written
    }

    fn record_save_failure(&mut self, revision: u64, error: String) {
        self.state.record_save_error(error.clone());
        self.events.emit(SessionEvent::SaveFailed { revision, error });
    }

    // -- Playhead and selection --------------------------------------------

    /// Move the playhead (clamped to zero). Returns true if it moved.
    pub fn set_playhead(&mut self, playhead_us: i64) -> bool {
        let moved = self.state.set_playhead(playhead_us);
        if moved {
            self.events.emit(SessionEvent::PlayheadMoved {
                playhead_us: self.state.playhead_us,
            });
        }
        moved
    }

    /// The playhead snapped to the nearest frame boundary.
    pub fn quantized_playhead_us(&self) -> i64 {
        quantize_time_us_to_frames(self.state.playhead_us, self.document.fps(), QuantizeMode::Round)
    }

    pub fn select_item(&mut self, track_id: &str, item_id: &str, multi: bool) {
        self.state.selection.select_item(track_id, item_id, multi);
        self.events.emit(SessionEvent::SelectionChanged);
    }

    pub fn toggle_item_selection(&mut self, track_id: &str, item_id: &str) {
        self.state.selection.toggle_item(track_id, item_id);
        self.events.emit(SessionEvent::SelectionChanged);
    }

    pub fn select_track(&mut self, track_id: &str, multi: bool) {
        self.state.selection.select_track(track_id, multi);
        self.events.emit(SessionEvent::SelectionChanged);
    }

    pub fn clear_selection(&mut self) {
        if !self.state.selection.is_empty() {
            self.state.selection.clear();
            self.events.emit(SessionEvent::SelectionChanged);
        }
    }
}
