//! Splitting a video clip's audio onto an audio track, and putting it back.

use sp_common::new_id;

use super::{check_overlap, ensure_unique_item_id, track_mut, track_ref, ApplyOptions};
use crate::error::{TimelineError, TimelineResult};
use crate::model::{find_overlap, SourceInfo};
use crate::types::{Clip, Item, TimelineDocument, TrackKind};

fn not_a_clip(item_id: &str) -> TimelineError {
    TimelineError::NotAClip {
        item_id: item_id.to_string(),
    }
}

pub(super) fn extract_audio_to_track(
    doc: &mut TimelineDocument,
    video_track_id: &str,
    item_id: &str,
    audio_track_id: Option<&str>,
    new_item_id: Option<String>,
    source_info: Option<SourceInfo>,
    opts: &ApplyOptions,
) -> TimelineResult<bool> {
    let video_track = track_ref(doc, video_track_id)?;
    if video_track.kind != TrackKind::Video {
        return Err(TimelineError::IncompatibleSource {
            track_id: video_track.id.clone(),
            kind: video_track.kind,
            source_desc: "an audio extraction".to_string(),
        });
    }
    let Some(item) = video_track.find_item(item_id) else {
        return Ok(false);
    };
    let video_clip = item.as_clip().ok_or_else(|| not_a_clip(item_id))?;
    if video_clip.audio_from_video_disabled == Some(true) {
        return Ok(false);
    }

    let has_audio = match source_info {
        Some(info) => info.has_audio && !info.is_image,
        None => video_clip.clip_type.has_source() && video_clip.is_image != Some(true),
    };
    if !has_audio {
        return Err(TimelineError::NoAudioInSource {
            item_id: item_id.to_string(),
        });
    }

    let range = video_clip.timeline_range;
    let target_id = match audio_track_id {
        Some(id) => {
            let track = track_ref(doc, id)?;
            if track.kind != TrackKind::Audio {
                return Err(TimelineError::IncompatibleSource {
                    track_id: track.id.clone(),
                    kind: track.kind,
                    source_desc: "extracted audio".to_string(),
                });
            }
            track.id.clone()
        }
        None => doc
            .tracks
            .iter()
            .find(|t| t.kind == TrackKind::Audio && find_overlap(t, &range, &[]).is_none())
            .map(|t| t.id.clone())
            .ok_or_else(|| TimelineError::NoAudioTrack {
                item_id: item_id.to_string(),
            })?,
    };

    if let Some(id) = &new_item_id {
        ensure_unique_item_id(doc, id)?;
    }
    let audio_clip = linked_audio_clip(video_clip, new_item_id.unwrap_or_else(|| new_id("clip")));

    let target = track_ref(doc, &target_id)?;
    check_overlap(target, &audio_clip.id, &audio_clip.timeline_range, &[], opts)?;

    track_mut(doc, &target_id)?.items.push(Item::Clip(audio_clip));
    if let Some(video_clip) = track_mut(doc, video_track_id)?
        .find_item_mut(item_id)
        .and_then(Item::as_clip_mut)
    {
        video_clip.audio_from_video_disabled = Some(true);
    }
    Ok(true)
}

/// Audio-track copy of a video clip, sharing its source and placement.
fn linked_audio_clip(video: &Clip, id: String) -> Clip {
    let mut clip = video.clone();
    clip.id = id;
    clip.linked_video_clip_id = Some(video.id.clone());
    clip.audio_from_video_disabled = None;
    clip.opacity = None;
    clip.transform = None;
    clip.effects = None;
    clip.transition_in = None;
    clip.transition_out = None;
    clip.is_image = None;
    clip
}

pub(super) fn return_audio_to_video(
    doc: &mut TimelineDocument,
    video_track_id: &str,
    item_id: &str,
) -> TimelineResult<bool> {
    let video_track = track_ref(doc, video_track_id)?;
    let Some(item) = video_track.find_item(item_id) else {
        return Ok(false);
    };
    let video_clip = item.as_clip().ok_or_else(|| not_a_clip(item_id))?;
    let was_extracted = video_clip.audio_from_video_disabled == Some(true);

    let mut removed = 0;
    for track in doc.tracks.iter_mut().filter(|t| t.kind == TrackKind::Audio) {
        let before = track.items.len();
        track.items.retain(|i| {
            i.as_clip()
                .and_then(|c| c.linked_video_clip_id.as_deref())
                != Some(item_id)
        });
        removed += before - track.items.len();
    }

    if let Some(video_clip) = track_mut(doc, video_track_id)?
        .find_item_mut(item_id)
        .and_then(Item::as_clip_mut)
    {
        video_clip.audio_from_video_disabled = None;
    }
    Ok(removed > 0 || was_extracted)
}
