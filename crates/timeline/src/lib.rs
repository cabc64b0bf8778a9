//! `sp-timeline` — Timeline document model and command engine for the Splice editor core.
//!
//! Every edit is a [`TimelineCommand`] applied to an immutable
//! `Arc<TimelineDocument>`, producing a new document (or the same `Arc` when
//! nothing changed). It handles:
//!
//! - **Model**: tracks, clips, gaps, transitions, markers
//! - **Invariants**: track-kind compatibility, no clip overlap, source range bounds
//! - **Commands**: add/move/trim/split/delete items, track management, markers,
//!   transitions, audio extraction
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use sp_timeline::{apply_timeline_command, TimelineCommand, TimelineDocument};
//!
//! let doc = Arc::new(TimelineDocument::fallback("doc", "Untitled", 30.0));
//! let cmd = TimelineCommand::add_media_clip("track_video_1", "media/a.mp4", Some(0), 3_000_000);
//! let applied = apply_timeline_command(&doc, cmd).unwrap();
//! assert!(applied.changed);
//! assert_eq!(applied.document.tracks[0].items.len(), 1);
//! ```

pub mod commands;
pub mod engine;
pub mod error;
pub mod model;
pub mod types;

// Re-export primary API
pub use commands::{ClipPatch, TimelineCommand, TrackPatch, TrimEdge};
pub use engine::{apply_all, apply_timeline_command, apply_with_options, Applied, ApplyOptions};
pub use error::{TimelineError, TimelineResult};
pub use model::{
    clip_boundaries, clips_overlap, find_clip, find_item, find_overlap, find_track,
    find_track_index, is_source_range_valid, total_duration_us, track_accepts_source,
    track_end_us, SourceInfo,
};
pub use types::{
    Clip, ClipTransform, ClipTransition, ClipType, DocumentMetadata, Effect, Gap, Item, Marker,
    MediaSource, TimeRange, Timebase, TimelineDocument, Track, TrackKind,
};
