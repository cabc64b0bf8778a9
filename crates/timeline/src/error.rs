//! Validation errors raised by the command engine.

use thiserror::Error;

use crate::types::TrackKind;

/// A command that cannot be applied. The input document is never modified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    #[error("Track not found: {track_id}")]
    TrackNotFound { track_id: String },

    #[error("Item {item_id} is not a clip")]
    NotAClip { item_id: String },

    #[error("Cannot place {source_desc} on {kind} track {track_id}")]
    IncompatibleSource {
        track_id: String,
        kind: TrackKind,
        source_desc: String,
    },

    #[error("Track {track_id} still holds {item_count} item(s)")]
    TrackNotEmpty { track_id: String, item_count: usize },

    #[error("Item {item_id} would overlap {other_id} on track {track_id}")]
    Overlap {
        track_id: String,
        item_id: String,
        other_id: String,
    },

    #[error("Invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Duplicate id: {id}")]
    DuplicateId { id: String },

    #[error("Source of clip {item_id} has no audio")]
    NoAudioInSource { item_id: String },

    #[error("No audio track available for clip {item_id}")]
    NoAudioTrack { item_id: String },
}

/// Convenience Result type for engine operations.
pub type TimelineResult<T> = Result<T, TimelineError>;
