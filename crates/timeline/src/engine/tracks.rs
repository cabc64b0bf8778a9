use std::collections::HashSet;

use sp_common::new_id;

use super::{merge_field, track_mut};
use crate::commands::TrackPatch;
use crate::error::{TimelineError, TimelineResult};
use crate::types::{TimelineDocument, Track, TrackKind};

fn default_track_name(doc: &TimelineDocument, kind: TrackKind) -> String {
    let n = doc.tracks.iter().filter(|t| t.kind == kind).count() + 1;
    match kind {
        TrackKind::Video => format!("Video {n}"),
        TrackKind::Audio => format!("Audio {n}"),
    }
}

pub(super) fn add_track(
    doc: &mut TimelineDocument,
    kind: TrackKind,
    name: Option<String>,
    track_id: Option<String>,
    index: Option<usize>,
) -> TimelineResult<bool> {
    let id = match track_id {
        Some(id) if doc.tracks.iter().any(|t| t.id == id) => {
            return Err(TimelineError::DuplicateId { id });
        }
        Some(id) => id,
        None => new_id(&format!("track_{kind}")),
    };
    let name = name.unwrap_or_else(|| default_track_name(doc, kind));
    let track = Track::new(id, kind, name);
    let at = index.unwrap_or(doc.tracks.len()).min(doc.tracks.len());
    doc.tracks.insert(at, track);
    Ok(true)
}

/// Replace the track order with `track_ids`.
///
/// The result holds only tracks that are both listed and present, in the
/// listed order. Unknown and repeated ids are skipped.
pub(super) fn reorder_tracks(doc: &mut TimelineDocument, track_ids: &[String]) -> bool {
    let before: Vec<String> = doc.tracks.iter().map(|t| t.id.clone()).collect();
    let mut seen = HashSet::new();
    let mut remaining = std::mem::take(&mut doc.tracks);
    let mut ordered = Vec::with_capacity(remaining.len());

    for id in track_ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        if let Some(pos) = remaining.iter().position(|t| &t.id == id) {
            ordered.push(remaining.remove(pos));
        }
    }

    let changed = ordered.iter().map(|t| &t.id).ne(before.iter());
    doc.tracks = ordered;
    changed
}

pub(super) fn rename_track(
    doc: &mut TimelineDocument,
    track_id: &str,
    name: String,
) -> TimelineResult<bool> {
    let track = track_mut(doc, track_id)?;
    if track.name == name {
        return Ok(false);
    }
    track.name = name;
    Ok(true)
}

pub(super) fn delete_track(
    doc: &mut TimelineDocument,
    track_id: &str,
    allow_non_empty: bool,
) -> TimelineResult<bool> {
    let track = track_mut(doc, track_id)?;
    if !track.items.is_empty() && !allow_non_empty {
        return Err(TimelineError::TrackNotEmpty {
            track_id: track_id.to_string(),
            item_count: track.items.len(),
        });
    }
    doc.tracks.retain(|t| t.id != track_id);
    Ok(true)
}

pub(super) fn update_track_properties(
    doc: &mut TimelineDocument,
    track_id: &str,
    patch: TrackPatch,
) -> TimelineResult<bool> {
    let track = track_mut(doc, track_id)?;
    let before = track.clone();
    merge_field(&mut track.video_hidden, patch.video_hidden);
    merge_field(&mut track.audio_muted, patch.audio_muted);
    merge_field(&mut track.audio_solo, patch.audio_solo);
    merge_field(&mut track.audio_gain, patch.audio_gain);
    merge_field(&mut track.audio_balance, patch.audio_balance);
    merge_field(&mut track.effects, patch.effects);
    Ok(*track != before)
}
