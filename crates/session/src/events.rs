//! Session change notifications.
//!
//! Observers subscribe to an [`EventBus`] and receive [`SessionEvent`]s on
//! a crossbeam channel. Emitting never blocks; subscribers whose receiver
//! was dropped are pruned on the next emit.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A document replaced the previous one (load or reset).
    DocumentLoaded { document_id: String },
    /// The document changed; `command_type` is `None` for undo/redo.
    DocumentChanged {
        revision: u64,
        command_type: Option<String>,
    },
    HistoryChanged { can_undo: bool, can_redo: bool },
    Saved { revision: u64 },
    SaveFailed { revision: u64, error: String },
    PlayheadMoved { playhead_us: i64 },
    SelectionChanged,
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<SessionEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn emit(&self, event: SessionEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
