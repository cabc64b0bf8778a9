//! Command engine: `apply(document, command) -> (document', changed)`.
//!
//! The engine never mutates its input. Each command runs against a private
//! copy; on success the copy becomes the new document, on failure it is
//! dropped, so callers never observe a partially applied command. A command
//! that changes nothing hands back the *same* `Arc`, and callers compare with
//! `Arc::ptr_eq` (or check `changed`) to skip history, saving, and dirty marks.

mod audio;
mod clips;
mod markers;
mod tracks;

use std::sync::Arc;

use sp_common::{frame_duration_us, OverlapPolicy};
use tracing::debug;

use crate::commands::TimelineCommand;
use crate::error::{TimelineError, TimelineResult};
use crate::model::find_overlap;
use crate::types::{TimeRange, TimelineDocument, Track};

/// Knobs that change how commands are validated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    pub overlap_policy: OverlapPolicy,
}

/// Result of applying a command.
#[derive(Clone, Debug)]
pub struct Applied {
    pub document: Arc<TimelineDocument>,
    /// `false` means `document` is the input `Arc`, untouched.
    pub changed: bool,
}

impl Applied {
    fn unchanged(doc: &Arc<TimelineDocument>) -> Self {
        Self {
            document: Arc::clone(doc),
            changed: false,
        }
    }
}

/// Apply a command with the default options (overlaps rejected).
pub fn apply_timeline_command(
    doc: &Arc<TimelineDocument>,
    command: TimelineCommand,
) -> TimelineResult<Applied> {
    apply_with_options(doc, command, &ApplyOptions::default())
}

/// Apply a command.
pub fn apply_with_options(
    doc: &Arc<TimelineDocument>,
    command: TimelineCommand,
    opts: &ApplyOptions,
) -> TimelineResult<Applied> {
    let command_type = command.command_type();
    let mut next = (**doc).clone();

    let changed = match command {
        TimelineCommand::AddTrack {
            kind,
            name,
            track_id,
            index,
        } => tracks::add_track(&mut next, kind, name, track_id, index)?,
        TimelineCommand::AddClipToTrack {
            track_id,
            item_id,
            clip_type,
            name,
            path,
            start_us,
            duration_us,
            source_start_us,
            source_duration_us,
            source_info,
        } => clips::add_clip(
            &mut next,
            clips::NewSourcedClip {
                track_id,
                item_id,
                clip_type,
                name,
                path,
                start_us,
                duration_us,
                source_start_us,
                source_duration_us,
                source_info,
            },
            opts,
        )?,
        TimelineCommand::AddVirtualClipToTrack {
            track_id,
            item_id,
            clip_type,
            name,
            start_us,
            duration_us,
            text,
            background_color,
        } => clips::add_virtual_clip(
            &mut next,
            clips::NewVirtualClip {
                track_id,
                item_id,
                clip_type,
                name,
                start_us,
                duration_us,
                text,
                background_color,
            },
            opts,
        )?,
        TimelineCommand::MoveItem {
            track_id,
            item_id,
            start_us,
        } => clips::move_item(&mut next, &track_id, &item_id, start_us, opts)?,
        TimelineCommand::MoveItemToTrack {
            from_track_id,
            to_track_id,
            item_id,
            start_us,
            source_info,
        } => clips::move_item_to_track(
            &mut next,
            &from_track_id,
            &to_track_id,
            &item_id,
            start_us,
            source_info,
            opts,
        )?,
        TimelineCommand::TrimItem {
            track_id,
            item_id,
            edge,
            delta_us,
        } => clips::trim_item(&mut next, &track_id, &item_id, edge, delta_us, opts)?,
        TimelineCommand::SplitItem {
            track_id,
            item_id,
            at_us,
            new_item_id,
        } => clips::split_item(&mut next, &track_id, &item_id, at_us, new_item_id)?,
        TimelineCommand::DeleteItems { track_id, item_ids } => {
            clips::delete_items(&mut next, &track_id, &item_ids)?
        }
        TimelineCommand::RemoveItem { track_id, item_id } => {
            clips::delete_items(&mut next, &track_id, &[item_id])?
        }
        TimelineCommand::ReorderTracks { track_ids } => tracks::reorder_tracks(&mut next, &track_ids),
        TimelineCommand::RenameTrack { track_id, name } => {
            tracks::rename_track(&mut next, &track_id, name)?
        }
        TimelineCommand::RenameItem {
            track_id,
            item_id,
            name,
        } => clips::rename_item(&mut next, &track_id, &item_id, name)?,
        TimelineCommand::DeleteTrack {
            track_id,
            allow_non_empty,
        } => tracks::delete_track(&mut next, &track_id, allow_non_empty)?,
        TimelineCommand::UpdateTrackProperties { track_id, patch } => {
            tracks::update_track_properties(&mut next, &track_id, patch)?
        }
        TimelineCommand::UpdateClipProperties {
            track_id,
            item_id,
            patch,
        } => clips::update_clip_properties(&mut next, &track_id, &item_id, patch)?,
        TimelineCommand::UpdateClipTransition {
            track_id,
            item_id,
            transition_in,
            transition_out,
        } => clips::update_clip_transition(
            &mut next,
            &track_id,
            &item_id,
            transition_in,
            transition_out,
        )?,
        TimelineCommand::UpdateClipSourceInfo {
            track_id,
            item_id,
            source_duration_us,
            is_image,
        } => clips::update_clip_source_info(
            &mut next,
            &track_id,
            &item_id,
            source_duration_us,
            is_image,
        )?,
        TimelineCommand::ExtractAudioToTrack {
            video_track_id,
            item_id,
            audio_track_id,
            new_item_id,
            source_info,
        } => audio::extract_audio_to_track(
            &mut next,
            &video_track_id,
            &item_id,
            audio_track_id.as_deref(),
            new_item_id,
            source_info,
            opts,
        )?,
        TimelineCommand::ReturnAudioToVideo {
            video_track_id,
            item_id,
        } => audio::return_audio_to_video(&mut next, &video_track_id, &item_id)?,
        TimelineCommand::AddMarker {
            marker_id,
            time_us,
            text,
        } => markers::add_marker(&mut next, marker_id, time_us, text)?,
        TimelineCommand::UpdateMarker {
            marker_id,
            time_us,
            text,
        } => markers::update_marker(&mut next, &marker_id, time_us, text),
        TimelineCommand::RemoveMarker { marker_id } => markers::remove_marker(&mut next, &marker_id),
    };

    debug!(command = command_type, changed, "Timeline command applied");

    if changed {
        Ok(Applied {
            document: Arc::new(next),
            changed: true,
        })
    } else {
        Ok(Applied::unchanged(doc))
    }
}

/// Apply several commands as one unit. The first failure aborts the whole
/// sequence; the caller's document is untouched either way.
pub fn apply_all(
    doc: &Arc<TimelineDocument>,
    commands: impl IntoIterator<Item = TimelineCommand>,
    opts: &ApplyOptions,
) -> TimelineResult<Applied> {
    let mut current = Arc::clone(doc);
    let mut changed = false;
    for command in commands {
        let applied = apply_with_options(&current, command, opts)?;
        changed |= applied.changed;
        current = applied.document;
    }
    if changed {
        Ok(Applied {
            document: current,
            changed: true,
        })
    } else {
        Ok(Applied::unchanged(doc))
    }
}

fn track_mut<'a>(doc: &'a mut TimelineDocument, track_id: &str) -> TimelineResult<&'a mut Track> {
    doc.tracks
        .iter_mut()
        .find(|t| t.id == track_id)
        .ok_or_else(|| TimelineError::TrackNotFound {
            track_id: track_id.to_string(),
        })
}

fn track_ref<'a>(doc: &'a TimelineDocument, track_id: &str) -> TimelineResult<&'a Track> {
    doc.tracks
        .iter()
        .find(|t| t.id == track_id)
        .ok_or_else(|| TimelineError::TrackNotFound {
            track_id: track_id.to_string(),
        })
}

fn item_id_exists(doc: &TimelineDocument, item_id: &str) -> bool {
    doc.tracks.iter().any(|t| t.find_item(item_id).is_some())
}

fn ensure_unique_item_id(doc: &TimelineDocument, item_id: &str) -> TimelineResult<()> {
    if item_id_exists(doc, item_id) {
        return Err(TimelineError::DuplicateId {
            id: item_id.to_string(),
        });
    }
    Ok(())
}

/// Reject `range` on `track` if it would overlap another clip under the policy.
fn check_overlap(
    track: &Track,
    item_id: &str,
    range: &TimeRange,
    ignore: &[&str],
    opts: &ApplyOptions,
) -> TimelineResult<()> {
    if opts.overlap_policy == OverlapPolicy::Allow {
        return Ok(());
    }
    match find_overlap(track, range, ignore) {
        Some(other) => Err(TimelineError::Overlap {
            track_id: track.id.clone(),
            item_id: item_id.to_string(),
            other_id: other.id.clone(),
        }),
        None => Ok(()),
    }
}

/// Apply one three-state patch field: `None` keeps, `Some(v)` replaces.
fn merge_field<T>(field: &mut Option<T>, update: Option<Option<T>>) {
    if let Some(value) = update {
        *field = value;
    }
}

/// Shortest duration an edit may leave an item with: one frame.
fn min_duration_us(doc: &TimelineDocument) -> i64 {
    frame_duration_us(doc.fps())
}
