//! The closed set of timeline edit commands.
//!
//! Every mutation of a `TimelineDocument` is expressed as a `TimelineCommand`
//! and applied by [`crate::engine::apply_timeline_command`]. Adding a command
//! means adding a variant here and one match arm in the engine.

use crate::model::SourceInfo;
use crate::types::{ClipTransform, ClipTransition, ClipType, Effect, TrackKind};

/// Which edge of an item a trim moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrimEdge {
    Start,
    End,
}

/// Partial update for a track.
///
/// Each field is `None` to leave it untouched, `Some(None)` to clear it, or
/// `Some(Some(value))` to set it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackPatch {
    pub video_hidden: Option<Option<bool>>,
    pub audio_muted: Option<Option<bool>>,
    pub audio_solo: Option<Option<bool>>,
    pub audio_gain: Option<Option<f64>>,
    pub audio_balance: Option<Option<f64>>,
    pub effects: Option<Option<Vec<Effect>>>,
}

/// Partial update for a clip. Same three-state convention as [`TrackPatch`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipPatch {
    pub disabled: Option<Option<bool>>,
    pub locked: Option<Option<bool>>,
    pub opacity: Option<Option<f64>>,
    pub effects: Option<Option<Vec<Effect>>>,
    pub speed: Option<Option<f64>>,
    pub transform: Option<Option<ClipTransform>>,
    pub audio_gain: Option<Option<f64>>,
    pub audio_balance: Option<Option<f64>>,
    pub audio_fade_in_us: Option<Option<i64>>,
    pub audio_fade_out_us: Option<Option<i64>>,
    pub freeze_frame_source_us: Option<Option<i64>>,
    pub text: Option<Option<String>>,
    pub background_color: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TimelineCommand {
    AddTrack {
        kind: TrackKind,
        name: Option<String>,
        track_id: Option<String>,
        /// Insert position; appended when `None` or past the end.
        index: Option<usize>,
    },
    /// Insert a media or nested-timeline clip.
    AddClipToTrack {
        track_id: String,
        item_id: Option<String>,
        clip_type: ClipType,
        name: Option<String>,
        path: String,
        /// Defaults to the end of the track.
        start_us: Option<i64>,
        duration_us: i64,
        source_start_us: i64,
        source_duration_us: Option<i64>,
        /// Streams present in the source; checked against the track kind when known.
        source_info: Option<SourceInfo>,
    },
    /// Insert an adjustment, background, or text clip.
    AddVirtualClipToTrack {
        track_id: String,
        item_id: Option<String>,
        clip_type: ClipType,
        name: Option<String>,
        start_us: Option<i64>,
        duration_us: i64,
        text: Option<String>,
        background_color: Option<String>,
    },
    MoveItem {
        track_id: String,
        item_id: String,
        start_us: i64,
    },
    MoveItemToTrack {
        from_track_id: String,
        to_track_id: String,
        item_id: String,
        start_us: i64,
        source_info: Option<SourceInfo>,
    },
    TrimItem {
        track_id: String,
        item_id: String,
        edge: TrimEdge,
        /// Positive moves the edge later, negative earlier.
        delta_us: i64,
    },
    SplitItem {
        track_id: String,
        item_id: String,
        at_us: i64,
        /// Id for the right-hand piece; generated when `None`.
        new_item_id: Option<String>,
    },
    DeleteItems {
        track_id: String,
        item_ids: Vec<String>,
    },
    RemoveItem {
        track_id: String,
        item_id: String,
    },
    ReorderTracks {
        track_ids: Vec<String>,
    },
    RenameTrack {
        track_id: String,
        name: String,
    },
    RenameItem {
        track_id: String,
        item_id: String,
        name: String,
    },
    DeleteTrack {
        track_id: String,
        allow_non_empty: bool,
    },
    UpdateTrackProperties {
        track_id: String,
        patch: TrackPatch,
    },
    UpdateClipProperties {
        track_id: String,
        item_id: String,
        patch: ClipPatch,
    },
    UpdateClipTransition {
        track_id: String,
        item_id: String,
        transition_in: Option<Option<ClipTransition>>,
        transition_out: Option<Option<ClipTransition>>,
    },
    /// Record the true source length / image flag once the metadata resolver knows them.
    UpdateClipSourceInfo {
        track_id: String,
        item_id: String,
        source_duration_us: Option<i64>,
        is_image: Option<bool>,
    },
    ExtractAudioToTrack {
        video_track_id: String,
        item_id: String,
        audio_track_id: Option<String>,
        new_item_id: Option<String>,
        source_info: Option<SourceInfo>,
    },
    ReturnAudioToVideo {
        video_track_id: String,
        item_id: String,
    },
    AddMarker {
        marker_id: Option<String>,
        time_us: i64,
        text: String,
    },
    UpdateMarker {
        marker_id: String,
        time_us: Option<i64>,
        text: Option<String>,
    },
    RemoveMarker {
        marker_id: String,
    },
}

impl TimelineCommand {
    /// A media clip at `start_us` playing the first `duration_us` of `path`.
    pub fn add_media_clip(
        track_id: impl Into<String>,
        path: impl Into<String>,
        start_us: Option<i64>,
        duration_us: i64,
    ) -> Self {
        TimelineCommand::AddClipToTrack {
            track_id: track_id.into(),
            item_id: None,
            clip_type: ClipType::Media,
            name: None,
            path: path.into(),
            start_us,
            duration_us,
            source_start_us: 0,
            source_duration_us: None,
            source_info: None,
        }
    }

    /// Stable snake_case discriminant, recorded in history entries.
    pub fn command_type(&self) -> &'static str {
        match self {
            TimelineCommand::AddTrack { .. } => "add_track",
            TimelineCommand::AddClipToTrack { .. } => "add_clip_to_track",
            TimelineCommand::AddVirtualClipToTrack { .. } => "add_virtual_clip_to_track",
            TimelineCommand::MoveItem { .. } => "move_item",
            TimelineCommand::MoveItemToTrack { .. } => "move_item_to_track",
            TimelineCommand::TrimItem { .. } => "trim_item",
            TimelineCommand::SplitItem { .. } => "split_item",
            TimelineCommand::DeleteItems { .. } => "delete_items",
            TimelineCommand::RemoveItem { .. } => "remove_item",
            TimelineCommand::ReorderTracks { .. } => "reorder_tracks",
            TimelineCommand::RenameTrack { .. } => "rename_track",
            TimelineCommand::RenameItem { .. } => "rename_item",
            TimelineCommand::DeleteTrack { .. } => "delete_track",
            TimelineCommand::UpdateTrackProperties { .. } => "update_track_properties",
            TimelineCommand::UpdateClipProperties { .. } => "update_clip_properties",
            TimelineCommand::UpdateClipTransition { .. } => "update_clip_transition",
            TimelineCommand::UpdateClipSourceInfo { .. } => "update_clip_source_info",
            TimelineCommand::ExtractAudioToTrack { .. } => "extract_audio_to_track",
            TimelineCommand::ReturnAudioToVideo { .. } => "return_audio_to_video",
            TimelineCommand::AddMarker { .. } => "add_marker",
            TimelineCommand::UpdateMarker { .. } => "update_marker",
            TimelineCommand::RemoveMarker { .. } => "remove_marker",
        }
    }

    /// Human-readable label for undo/redo menus.
    pub fn label(&self) -> &'static str {
        match self {
            TimelineCommand::AddTrack { .. } => "Add track",
            TimelineCommand::AddClipToTrack { .. } => "Add clip",
            TimelineCommand::AddVirtualClipToTrack { .. } => "Add clip",
            TimelineCommand::MoveItem { .. } | TimelineCommand::MoveItemToTrack { .. } => {
                "Move clip"
            }
            TimelineCommand::TrimItem { .. } => "Trim clip",
            TimelineCommand::SplitItem { .. } => "Split clip",
            TimelineCommand::DeleteItems { .. } | TimelineCommand::RemoveItem { .. } => {
                "Delete clips"
            }
            TimelineCommand::ReorderTracks { .. } => "Reorder tracks",
            TimelineCommand::RenameTrack { .. } => "Rename track",
            TimelineCommand::RenameItem { .. } => "Rename clip",
            TimelineCommand::DeleteTrack { .. } => "Delete track",
            TimelineCommand::UpdateTrackProperties { .. } => "Track properties",
            TimelineCommand::UpdateClipProperties { .. } => "Clip properties",
            TimelineCommand::UpdateClipTransition { .. } => "Transition",
            TimelineCommand::UpdateClipSourceInfo { .. } => "Source info",
            TimelineCommand::ExtractAudioToTrack { .. } => "Extract audio",
            TimelineCommand::ReturnAudioToVideo { .. } => "Return audio",
            TimelineCommand::AddMarker { .. } => "Add marker",
            TimelineCommand::UpdateMarker { .. } => "Edit marker",
            TimelineCommand::RemoveMarker { .. } => "Remove marker",
        }
    }
}
