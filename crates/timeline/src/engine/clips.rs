//! Item-level commands: add, move, trim, split, delete, rename, property updates.

use sp_common::new_id;

use super::{
    check_overlap, ensure_unique_item_id, merge_field, min_duration_us, track_mut, track_ref, ApplyOptions,
};
use crate::commands::{ClipPatch, TrimEdge};
use crate::error::{TimelineError, TimelineResult};
use crate::model::{is_source_range_valid, track_accepts_source, track_end_us, SourceInfo};
use crate::types::{Clip, ClipTransition, ClipType, Gap, Item, TimeRange, TimelineDocument, TrackKind};

pub(super) struct NewSourcedClip {
    pub track_id: String,
    pub item_id: Option<String>,
    pub clip_type: ClipType,
    pub name: Option<String>,
    pub path: String,
    pub start_us: Option<i64>,
    pub duration_us: i64,
    pub source_start_us: i64,
    pub source_duration_us: Option<i64>,
    pub source_info: Option<SourceInfo>,
}

pub(super) struct NewVirtualClip {
    pub track_id: String,
    pub item_id: Option<String>,
    pub clip_type: ClipType,
    pub name: Option<String>,
    pub start_us: Option<i64>,
    pub duration_us: i64,
    pub text: Option<String>,
    pub background_color: Option<String>,
}

/// File name component of a project-relative path.
fn display_name(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

fn positive_duration(duration_us: i64) -> TimelineResult<()> {
    if duration_us <= 0 {
        return Err(TimelineError::InvalidRange {
            reason: format!("duration must be positive, got {duration_us}"),
        });
    }
    Ok(())
}

fn non_negative_start(start_us: i64) -> TimelineResult<()> {
    if start_us < 0 {
        return Err(TimelineError::InvalidRange {
            reason: format!("start must not be negative, got {start_us}"),
        });
    }
    Ok(())
}

fn incompatible(track_id: &str, kind: TrackKind, source_desc: &str) -> TimelineError {
    TimelineError::IncompatibleSource {
        track_id: track_id.to_string(),
        kind,
        source_desc: source_desc.to_string(),
    }
}

pub(super) fn add_clip(
    doc: &mut TimelineDocument,
    new: NewSourcedClip,
    opts: &ApplyOptions,
) -> TimelineResult<bool> {
    if !new.clip_type.has_source() {
        return Err(TimelineError::InvalidValue {
            field: "clip_type",
            reason: format!("{} clips have no source", new.clip_type.as_str()),
        });
    }
    positive_duration(new.duration_us)?;
    if let Some(id) = &new.item_id {
        ensure_unique_item_id(doc, id)?;
    }

    let track = track_mut(doc, &new.track_id)?;
    if let Some(info) = &new.source_info {
        if !track_accepts_source(track.kind, info) {
            return Err(incompatible(&track.id, track.kind, info.describe()));
        }
    }

    let start_us = new.start_us.unwrap_or_else(|| track_end_us(track));
    non_negative_start(start_us)?;

    let id = new.item_id.unwrap_or_else(|| new_id("clip"));
    let name = new.name.unwrap_or_else(|| display_name(&new.path));
    let mut clip = Clip::sourced(
        id,
        name,
        new.clip_type,
        new.path,
        TimeRange::new(start_us, new.duration_us),
        TimeRange::new(new.source_start_us, new.duration_us),
    );
    clip.source_duration_us = new.source_duration_us;
    clip.is_image = new.source_info.map(|info| info.is_image);

    if !is_source_range_valid(&clip) {
        return Err(TimelineError::InvalidRange {
            reason: format!(
                "source range {}+{} does not fit source of {:?} us",
                new.source_start_us, new.duration_us, new.source_duration_us
            ),
        });
    }

    check_overlap(track, &clip.id, &clip.timeline_range, &[], opts)?;
    track.items.push(Item::Clip(clip));
    Ok(true)
}

pub(super) fn add_virtual_clip(
    doc: &mut TimelineDocument,
    new: NewVirtualClip,
    opts: &ApplyOptions,
) -> TimelineResult<bool> {
    if !new.clip_type.is_virtual() {
        return Err(TimelineError::InvalidValue {
            field: "clip_type",
            reason: format!("{} clips need a source", new.clip_type.as_str()),
        });
    }
    positive_duration(new.duration_us)?;
    if let Some(id) = &new.item_id {
        ensure_unique_item_id(doc, id)?;
    }

    let track = track_mut(doc, &new.track_id)?;
    if track.kind != TrackKind::Video {
        return Err(incompatible(
            &track.id,
            track.kind,
            &format!("a {} clip", new.clip_type.as_str()),
        ));
    }

    let start_us = new.start_us.unwrap_or_else(|| track_end_us(track));
    non_negative_start(start_us)?;

    let id = new.item_id.unwrap_or_else(|| new_id("clip"));
    let name = new
        .name
        .unwrap_or_else(|| new.clip_type.as_str().to_string());
    let mut clip = Clip::virtual_clip(
        id,
        name,
        new.clip_type,
        TimeRange::new(start_us, new.duration_us),
    );
    clip.text = new.text;
    clip.background_color = new.background_color;

    check_overlap(track, &clip.id, &clip.timeline_range, &[], opts)?;
    track.items.push(Item::Clip(clip));
    Ok(true)
}

pub(super) fn move_item(
    doc: &mut TimelineDocument,
    track_id: &str,
    item_id: &str,
    start_us: i64,
    opts: &ApplyOptions,
) -> TimelineResult<bool> {
    let track = track_mut(doc, track_id)?;
    let Some(item) = track.find_item(item_id) else {
        return Ok(false);
    };
    let start_us = start_us.max(0);
    if item.start_us() == start_us {
        return Ok(false);
    }

    let mut range = item.timeline_range();
    range.start_us = start_us;
    if matches!(item, Item::Clip(_)) {
        check_overlap(track, item_id, &range, &[item_id], opts)?;
    }

    if let Some(item) = track.find_item_mut(item_id) {
        item.set_start_us(start_us);
    }
    Ok(true)
}

/// What we can tell about a clip's streams without asking the resolver.
fn inferred_source_info(clip: &Clip) -> Option<SourceInfo> {
    if clip.is_image == Some(true) {
        return Some(SourceInfo::image());
    }
    if clip.linked_video_clip_id.is_some() {
        return Some(SourceInfo::audio_only());
    }
    None
}

pub(super) fn move_item_to_track(
    doc: &mut TimelineDocument,
    from_track_id: &str,
    to_track_id: &str,
    item_id: &str,
    start_us: i64,
    source_info: Option<SourceInfo>,
    opts: &ApplyOptions,
) -> TimelineResult<bool> {
    if from_track_id == to_track_id {
        return move_item(doc, from_track_id, item_id, start_us, opts);
    }

    let target = track_ref(doc, to_track_id)?;
    let source = track_ref(doc, from_track_id)?;
    let Some(item) = source.find_item(item_id) else {
        return Ok(false);
    };

    let mut moved = item.clone();
    moved.set_start_us(start_us.max(0));

    if let Item::Clip(clip) = &moved {
        if clip.clip_type.is_virtual() {
            if target.kind != TrackKind::Video {
                return Err(incompatible(
                    &target.id,
                    target.kind,
                    &format!("a {} clip", clip.clip_type.as_str()),
                ));
            }
        } else if let Some(info) = source_info.or_else(|| inferred_source_info(clip)) {
            if !track_accepts_source(target.kind, &info) {
                return Err(incompatible(&target.id, target.kind, info.describe()));
            }
        }
        check_overlap(target, item_id, &clip.timeline_range, &[], opts)?;
    }

    let source = track_mut(doc, from_track_id)?;
    source.items.retain(|i| i.id() != item_id);
    let target = track_mut(doc, to_track_id)?;
    target.items.push(moved);
    Ok(true)
}

/// Clamp fades so they never run past the clip.
fn clamp_fades(clip: &mut Clip) {
    let duration = clip.timeline_range.duration_us;
    for fade in [&mut clip.audio_fade_in_us, &mut clip.audio_fade_out_us] {
        if let Some(value) = fade {
            *value = (*value).clamp(0, duration);
        }
    }
}

/// Source bounds apply to media/timeline clips that are not still images.
fn source_bounded(clip: &Clip) -> bool {
    clip.clip_type.has_source() && clip.is_image != Some(true) && clip.source_range.is_some()
}

pub(super) fn trim_item(
    doc: &mut TimelineDocument,
    track_id: &str,
    item_id: &str,
    edge: TrimEdge,
    delta_us: i64,
    opts: &ApplyOptions,
) -> TimelineResult<bool> {
    let min_duration = min_duration_us(doc);
    let track = track_mut(doc, track_id)?;
    let Some(item) = track.find_item(item_id) else {
        return Ok(false);
    };

    let range = item.timeline_range();
    let floor = min_duration.min(range.duration_us);
    let clip = item.as_clip();

    let delta = match edge {
        TrimEdge::Start => {
            let mut delta = delta_us
                .max(-range.start_us)
                .min(range.duration_us - floor);
            if let Some(clip) = clip.filter(|c| source_bounded(c)) {
                if let Some(src) = clip.source_range {
                    let max_extend = (src.start_us as f64 / clip.speed_factor()).floor() as i64;
                    delta = delta.max(-max_extend);
                }
            }
            delta
        }
        TrimEdge::End => {
            let mut delta = delta_us.max(-(range.duration_us - floor));
            if let Some(clip) = clip.filter(|c| source_bounded(c)) {
                if let (Some(src), Some(total)) = (clip.source_range, clip.source_duration_us) {
                    let room = (total - src.end_us()).max(0);
                    let max_extend = (room as f64 / clip.speed_factor()).floor() as i64;
                    delta = delta.min(max_extend);
                }
            }
            delta
        }
    };
    if delta == 0 {
        return Ok(false);
    }

    let mut trimmed = item.clone();
    match &mut trimmed {
        Item::Gap(gap) => apply_trim(&mut gap.timeline_range, edge, delta),
        Item::Clip(clip) => {
            apply_trim(&mut clip.timeline_range, edge, delta);
            let source_delta = clip.to_source_delta(delta);
            let total = clip.source_duration_us;
            let bounded = source_bounded(clip);
            if let Some(src) = clip.source_range.as_mut() {
                apply_trim(src, edge, source_delta);
                if bounded {
                    src.start_us = src.start_us.max(0);
                    if let Some(total) = total {
                        src.duration_us = src.duration_us.min(total - src.start_us);
                    }
                }
                src.duration_us = src.duration_us.max(1);
            }
            clamp_fades(clip);
        }
    }

    if let Item::Clip(clip) = &trimmed {
        check_overlap(track, item_id, &clip.timeline_range, &[item_id], opts)?;
    }
    if let Some(slot) = track.find_item_mut(item_id) {
        *slot = trimmed;
    }
    Ok(true)
}

/// Move one edge of `range` by `delta`, keeping the other edge fixed.
fn apply_trim(range: &mut TimeRange, edge: TrimEdge, delta: i64) {
    match edge {
        TrimEdge::Start => {
            range.start_us += delta;
            range.duration_us -= delta;
        }
        TrimEdge::End => range.duration_us += delta,
    }
}

pub(super) fn split_item(
    doc: &mut TimelineDocument,
    track_id: &str,
    item_id: &str,
    at_us: i64,
    new_item_id: Option<String>,
) -> TimelineResult<bool> {
    if let Some(id) = &new_item_id {
        ensure_unique_item_id(doc, id)?;
    }
    let track = track_mut(doc, track_id)?;
    let Some(index) = track.items.iter().position(|i| i.id() == item_id) else {
        return Ok(false);
    };
    let range = track.items[index].timeline_range();
    if !range.strictly_contains(at_us) {
        return Ok(false);
    }

    let right_id = new_item_id.unwrap_or_else(|| new_id("clip"));
    let left_duration = at_us - range.start_us;
    let right_range = TimeRange::new(at_us, range.end_us() - at_us);

    let (left, right) = match &track.items[index] {
        Item::Gap(gap) => {
            let mut left = gap.clone();
            left.timeline_range.duration_us = left_duration;
            let right = Gap {
                id: right_id,
                timeline_range: right_range,
            };
            (Item::Gap(left), Item::Gap(right))
        }
        Item::Clip(clip) => {
            let (left, right) = split_clip(clip, left_duration, right_range, right_id);
            (Item::Clip(left), Item::Clip(right))
        }
    };

    track.items[index] = left;
    track.items.insert(index + 1, right);
    Ok(true)
}

fn split_clip(clip: &Clip, left_duration: i64, right_range: TimeRange, right_id: String) -> (Clip, Clip) {
    let mut left = clip.clone();
    let mut right = clip.clone();
    right.id = right_id;

    left.timeline_range.duration_us = left_duration;
    right.timeline_range = right_range;

    if let Some(src) = clip.source_range {
        let left_source = clip.to_source_delta(left_duration).clamp(0, src.duration_us);
        left.source_range = Some(TimeRange::new(src.start_us, left_source));
        right.source_range = Some(TimeRange::new(
            src.start_us + left_source,
            src.duration_us - left_source,
        ));
    }

    // The cut becomes a hard edge on both sides.
    left.transition_out = None;
    left.audio_fade_out_us = None;
    right.transition_in = None;
    right.audio_fade_in_us = None;
    clamp_fades(&mut left);
    clamp_fades(&mut right);

    (left, right)
}

pub(super) fn delete_items(
    doc: &mut TimelineDocument,
    track_id: &str,
    item_ids: &[String],
) -> TimelineResult<bool> {
    let track = track_mut(doc, track_id)?;
    let before = track.items.len();
    track.items.retain(|i| !item_ids.iter().any(|id| id == i.id()));
    Ok(track.items.len() != before)
}

pub(super) fn rename_item(
    doc: &mut TimelineDocument,
    track_id: &str,
    item_id: &str,
    name: String,
) -> TimelineResult<bool> {
    let track = track_mut(doc, track_id)?;
    match track.find_item_mut(item_id).and_then(Item::as_clip_mut) {
        Some(clip) if clip.name != name => {
            clip.name = name;
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn validate_clip_patch(patch: &ClipPatch) -> TimelineResult<()> {
    if let Some(Some(opacity)) = patch.opacity {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(TimelineError::InvalidValue {
                field: "opacity",
                reason: format!("{opacity} is outside 0..=1"),
            });
        }
    }
    if let Some(Some(speed)) = patch.speed {
        if !(speed > 0.0) {
            return Err(TimelineError::InvalidValue {
                field: "speed",
                reason: format!("{speed} must be positive"),
            });
        }
    }
    for (field, value) in [
        ("audio_fade_in_us", patch.audio_fade_in_us),
        ("audio_fade_out_us", patch.audio_fade_out_us),
        ("freeze_frame_source_us", patch.freeze_frame_source_us),
    ] {
        if let Some(Some(v)) = value {
            if v < 0 {
                return Err(TimelineError::InvalidValue {
                    field,
                    reason: format!("{v} is negative"),
                });
            }
        }
    }
    Ok(())
}

pub(super) fn update_clip_properties(
    doc: &mut TimelineDocument,
    track_id: &str,
    item_id: &str,
    patch: ClipPatch,
) -> TimelineResult<bool> {
    validate_clip_patch(&patch)?;
    let track = track_mut(doc, track_id)?;
    let Some(clip) = track.find_item_mut(item_id).and_then(Item::as_clip_mut) else {
        return Ok(false);
    };

    let before = clip.clone();
    merge_field(&mut clip.disabled, patch.disabled);
    merge_field(&mut clip.locked, patch.locked);
    merge_field(&mut clip.opacity, patch.opacity);
    merge_field(&mut clip.effects, patch.effects);
    merge_field(&mut clip.speed, patch.speed);
    merge_field(&mut clip.transform, patch.transform);
    merge_field(&mut clip.audio_gain, patch.audio_gain);
    merge_field(&mut clip.audio_balance, patch.audio_balance);
    merge_field(&mut clip.audio_fade_in_us, patch.audio_fade_in_us);
    merge_field(&mut clip.audio_fade_out_us, patch.audio_fade_out_us);
    merge_field(&mut clip.freeze_frame_source_us, patch.freeze_frame_source_us);
    merge_field(&mut clip.text, patch.text);
    merge_field(&mut clip.background_color, patch.background_color);
    clamp_fades(clip);

    Ok(*clip != before)
}

fn checked_transition(
    transition: Option<Option<ClipTransition>>,
    clip_duration: i64,
) -> TimelineResult<Option<Option<ClipTransition>>> {
    match transition {
        Some(Some(mut t)) => {
            if t.duration_us <= 0 {
                return Err(TimelineError::InvalidValue {
                    field: "transition.duration_us",
                    reason: format!("{} must be positive", t.duration_us),
                });
            }
            t.duration_us = t.duration_us.min(clip_duration);
            Ok(Some(Some(t)))
        }
        other => Ok(other),
    }
}

pub(super) fn update_clip_transition(
    doc: &mut TimelineDocument,
    track_id: &str,
    item_id: &str,
    transition_in: Option<Option<ClipTransition>>,
    transition_out: Option<Option<ClipTransition>>,
) -> TimelineResult<bool> {
    let track = track_mut(doc, track_id)?;
    let Some(clip) = track.find_item_mut(item_id).and_then(Item::as_clip_mut) else {
        return Ok(false);
    };
    let duration = clip.timeline_range.duration_us;
    let transition_in = checked_transition(transition_in, duration)?;
    let transition_out = checked_transition(transition_out, duration)?;

    let before = clip.clone();
    merge_field(&mut clip.transition_in, transition_in);
    merge_field(&mut clip.transition_out, transition_out);
    Ok(*clip != before)
}

pub(super) fn update_clip_source_info(
    doc: &mut TimelineDocument,
    track_id: &str,
    item_id: &str,
    source_duration_us: Option<i64>,
    is_image: Option<bool>,
) -> TimelineResult<bool> {
    let track = track_mut(doc, track_id)?;
    let Some(clip) = track.find_item_mut(item_id).and_then(Item::as_clip_mut) else {
        return Ok(false);
    };
    if !clip.clip_type.has_source() {
        return Ok(false);
    }

    let before = clip.clone();
    if let Some(total) = source_duration_us {
        if total <= 0 {
            return Err(TimelineError::InvalidValue {
                field: "source_duration_us",
                reason: format!("{total} must be positive"),
            });
        }
        clip.source_duration_us = Some(total);
    }
    if is_image.is_some() {
        clip.is_image = is_image;
    }
    Ok(*clip != before)
}
