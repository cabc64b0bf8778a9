//! `sp-session` — Edit session controller for the Splice editor core.
//!
//! An [`EditSession`] owns the live `TimelineDocument` and is the only
//! thing that replaces it. It composes:
//!
//! - the command engine (`sp-timeline`) for every change
//! - undo/redo history, debounce timers and derived state (`sp-app-state`)
//! - OTIO load/save (`sp-project`) through an injected [`Storage`]
//! - a [`MetadataResolver`] for source lengths and stream flags
//! - an [`EventBus`] that tells observers what changed
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use sp_app_state::ManualClock;
//! use sp_project::DocumentDefaults;
//! use sp_session::{
//!     ApplyMode, EditSession, MediaMetadata, MemoryStorage, MetadataTable, SessionOptions,
//! };
//!
//! let metadata = MetadataTable::new().with("media/a.mp4", MediaMetadata::from_seconds(3.0, true, true));
//! let mut session = EditSession::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(metadata),
//!     Arc::new(ManualClock::new()),
//!     SessionOptions::new("timeline.otio", DocumentDefaults::new("doc", "Main", 30.0)),
//! );
//! session.load().unwrap();
//!
//! let clip_id = session.add_clip_from_path("track_video_1", "media/a.mp4", None).unwrap();
//! session.set_playhead(1_000_000);
//! assert_eq!(session.split_at_playhead().unwrap(), 1);
//! assert!(session.undo());
//! assert!(sp_timeline::find_clip(session.document(), &clip_id).is_some());
//! session.flush();
//! ```

pub mod error;
pub mod events;
pub mod metadata;
pub mod persist;
pub mod session;
pub mod storage;

// Re-export primary API at crate root
pub use error::{SessionError, SessionResult};
pub use events::{EventBus, SessionEvent};
pub use metadata::{is_image_path, CachedMetadata, MediaMetadata, MetadataResolver, MetadataTable};
pub use persist::{WriteJob, WriteOutcome, WriteQueue};
pub use session::{
    ApplyMode, EditSession, HistoryMode, JumpDirection, LoadTicket, SaveMode, SessionOptions,
    TrimSide,
};
pub use storage::{FileHandle, FsStorage, MemoryStorage, Storage};
