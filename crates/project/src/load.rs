//! Timeline deserialization: reading a `TimelineDocument` from OTIO JSON.
//!
//! [`try_parse`] reports every failure. [`parse`] never fails: unreadable
//! text yields the fallback document built from [`DocumentDefaults`].

use std::collections::HashSet;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sp_common::new_id;
use sp_timeline::{
    Clip, ClipType, DocumentMetadata, Gap, Item, TimeRange, Timebase, TimelineDocument, Track,
    TrackKind,
};
use tracing::{debug, info, warn};

use crate::error::{ProjectError, ProjectResult};
use crate::types::{
    schema_of, ClipVendor, DocumentDefaults, ExternalReference, GapVendor, GeneratorReference,
    OtioClip, OtioGap, OtioTimeRange, OtioTimeline, OtioTrack, RationalTime, TimelineVendor,
    TrackVendor, DEFAULT_MEDIA_KEY, MICROSECOND_RATE, PARAM_BACKGROUND_COLOR, PARAM_TEXT,
    SCHEMA_CLIP_V1, SCHEMA_CLIP_V2, SCHEMA_EXTERNAL_REF, SCHEMA_GAP, SCHEMA_GENERATOR_REF,
    SCHEMA_STACK, SCHEMA_TIMELINE, SCHEMA_TRACK, TRACK_KIND_AUDIO, TRACK_KIND_VIDEO, VENDOR_KEY,
};

fn invalid(reason: impl Into<String>) -> ProjectError {
    ProjectError::InvalidTimeline {
        reason: reason.into(),
    }
}

/// Parse OTIO JSON into a document.
///
/// Ids and frame rate missing from the file come from `defaults`.
pub fn try_parse(text: &str, defaults: &DocumentDefaults) -> ProjectResult<TimelineDocument> {
    let value: Value = serde_json::from_str(text)?;
    match schema_of(&value) {
        Some(SCHEMA_TIMELINE) => {}
        other => {
            return Err(ProjectError::UnsupportedSchema {
                schema: other.unwrap_or("<none>").to_string(),
            })
        }
    }
    let otio: OtioTimeline = serde_json::from_value(value)?;
    let doc = from_otio(otio, defaults)?;

    debug!(
        document_id = %doc.id,
        track_count = doc.tracks.len(),
        marker_count = doc.metadata.markers.len(),
        "Deserialized timeline from OTIO JSON"
    );
    Ok(doc)
}

/// Parse OTIO JSON, substituting the fallback document on any failure.
pub fn parse(text: &str, defaults: &DocumentDefaults) -> TimelineDocument {
    if text.trim().is_empty() {
        debug!("Empty timeline text, using fallback document");
        return fallback_document(defaults);
    }
    match try_parse(text, defaults) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, document_id = %defaults.id, "Unreadable timeline, using fallback document");
            fallback_document(defaults)
        }
    }
}

/// The empty two-track document used when nothing can be loaded.
pub fn fallback_document(defaults: &DocumentDefaults) -> TimelineDocument {
    TimelineDocument::fallback(defaults.id.clone(), defaults.name.clone(), defaults.fps)
}

/// Load a timeline from a file at the given path.
pub fn load_timeline_file(path: &Path, defaults: &DocumentDefaults) -> ProjectResult<TimelineDocument> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read timeline file");
        ProjectError::Io(e)
    })?;

    let doc = try_parse(&json, defaults)?;

    info!(
        document_id = %doc.id,
        path = %path.display(),
        tracks = doc.tracks.len(),
        "Timeline loaded successfully"
    );
    Ok(doc)
}

/// Convert an OTIO object tree into a document.
pub fn from_otio(otio: OtioTimeline, defaults: &DocumentDefaults) -> ProjectResult<TimelineDocument> {
    if otio.tracks.schema != SCHEMA_STACK {
        return Err(ProjectError::UnsupportedSchema {
            schema: otio.tracks.schema,
        });
    }

    let vendor: TimelineVendor = read_vendor(&otio.metadata);
    let fps = vendor.fps.unwrap_or(defaults.fps);
    if !(fps > 0.0 && fps.is_finite()) {
        return Err(invalid(format!("invalid frame rate: {fps}")));
    }

    let mut tracks = Vec::with_capacity(otio.tracks.children.len());
    for child in otio.tracks.children {
        match schema_of(&child) {
            Some(SCHEMA_TRACK) => {
                if let Some(track) = track_from_otio(serde_json::from_value(child)?)? {
                    tracks.push(track);
                }
            }
            other => warn!(schema = other.unwrap_or("<none>"), "Skipping unsupported stack child"),
        }
    }

    let doc = TimelineDocument {
        id: vendor.id.unwrap_or_else(|| defaults.id.clone()),
        name: if otio.name.is_empty() {
            defaults.name.clone()
        } else {
            otio.name
        },
        timebase: Timebase { fps },
        tracks,
        metadata: DocumentMetadata {
            markers: vendor.markers,
            playhead_us: vendor.playhead_us,
            extra: vendor.extra,
        },
    };
    validate_document(&doc)?;
    Ok(doc)
}

/// Our namespace inside an OTIO metadata map, or the default when absent
/// or unreadable.
fn read_vendor<T: DeserializeOwned + Default>(metadata: &Map<String, Value>) -> T {
    try_read_vendor(metadata).unwrap_or_default()
}

fn try_read_vendor<T: DeserializeOwned>(metadata: &Map<String, Value>) -> Option<T> {
    let raw = metadata.get(VENDOR_KEY)?;
    match serde_json::from_value(raw.clone()) {
        Ok(vendor) => Some(vendor),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed vendor metadata");
            None
        }
    }
}

fn time_to_us(time: &RationalTime) -> ProjectResult<i64> {
    if !(time.rate > 0.0 && time.rate.is_finite() && time.value.is_finite()) {
        return Err(invalid(format!(
            "invalid time {} at rate {}",
            time.value, time.rate
        )));
    }
    if time.rate == MICROSECOND_RATE {
        return Ok(time.value.round() as i64);
    }
    Ok((time.value * MICROSECOND_RATE / time.rate).round() as i64)
}

/// `(start_us, duration_us)` of an OTIO time range.
fn range_to_us(range: &OtioTimeRange) -> ProjectResult<(i64, i64)> {
    let start = time_to_us(&range.start_time)?;
    let duration = time_to_us(&range.duration)?;
    if duration < 0 {
        return Err(invalid(format!("negative duration: {duration}")));
    }
    Ok((start, duration))
}

fn track_from_otio(otio: OtioTrack) -> ProjectResult<Option<Track>> {
    let kind = match otio.kind.as_str() {
        TRACK_KIND_VIDEO => TrackKind::Video,
        TRACK_KIND_AUDIO => TrackKind::Audio,
        other => {
            warn!(kind = other, name = %otio.name, "Skipping track of unknown kind");
            return Ok(None);
        }
    };
    let vendor: TrackVendor = read_vendor(&otio.metadata);

    let mut track = Track::new(
        vendor.id.unwrap_or_else(|| new_id("track")),
        kind,
        otio.name,
    );
    track.video_hidden = vendor.video_hidden;
    track.audio_muted = vendor.audio_muted;
    track.audio_solo = vendor.audio_solo;
    track.audio_gain = vendor.audio_gain;
    track.audio_balance = vendor.audio_balance;
    track.effects = vendor.effects;

    let mut cursor = 0_i64;
    for child in otio.children {
        match schema_of(&child) {
            Some(SCHEMA_GAP) => {
                let gap: OtioGap = serde_json::from_value(child)?;
                let (_, duration) = range_to_us(&gap.source_range)?;
                let Some(vendor) = try_read_vendor::<GapVendor>(&gap.metadata) else {
                    // Filler between items: advances time, is not an item.
                    cursor += duration;
                    continue;
                };
                let start = vendor.timeline_start_us.unwrap_or(cursor);
                track.items.push(Item::Gap(Gap {
                    id: vendor.id,
                    timeline_range: TimeRange::new(start, duration),
                }));
                cursor = start + duration;
            }
            Some(SCHEMA_CLIP_V1 | SCHEMA_CLIP_V2) => {
                let otio_clip: OtioClip = serde_json::from_value(child)?;
                match clip_from_otio(otio_clip, cursor)? {
                    Some(clip) => {
                        cursor = clip.timeline_range.end_us();
                        track.items.push(Item::Clip(clip));
                    }
                    None => continue,
                }
            }
            other => {
                warn!(
                    schema = other.unwrap_or("<none>"),
                    track_id = %track.id,
                    "Skipping unsupported track child"
                );
            }
        }
    }
    Ok(Some(track))
}

/// The media reference a clip plays: the active entry of `Clip.2`
/// `media_references`, or the single `Clip.1` `media_reference`.
fn active_reference(clip: &mut OtioClip) -> Option<Value> {
    if let Some(mut refs) = clip.media_references.take() {
        let key = clip
            .active_media_reference_key
            .clone()
            .unwrap_or_else(|| DEFAULT_MEDIA_KEY.to_string());
        return refs
            .remove(&key)
            .or_else(|| refs.into_values().next());
    }
    clip.media_reference.take()
}

fn clip_from_otio(mut otio: OtioClip, cursor: i64) -> ProjectResult<Option<Clip>> {
    let vendor: ClipVendor = read_vendor(&otio.metadata);
    let reference = active_reference(&mut otio);

    let range = otio.source_range.as_ref().ok_or_else(|| {
        invalid(format!("clip '{}' has no source_range", otio.name))
    })?;
    let (source_start, duration) = range_to_us(range)?;
    let start = vendor.timeline_start_us.unwrap_or(cursor);
    let id = vendor.id.clone().unwrap_or_else(|| new_id("clip"));
    let timeline_range = TimeRange::new(start, duration);

    let reference_schema = reference.as_ref().and_then(schema_of).map(str::to_string);
    let mut clip = match (reference_schema.as_deref(), reference) {
        (Some(SCHEMA_EXTERNAL_REF), Some(raw)) => {
            let reference: ExternalReference = serde_json::from_value(raw)?;
            let clip_type = vendor
                .clip_type
                .filter(|t| t.has_source())
                .unwrap_or_else(|| source_clip_type(&reference.target_url));
            let source_duration = vendor.source_range_duration_us.unwrap_or(duration);
            let mut clip = Clip::sourced(
                id,
                otio.name,
                clip_type,
                reference.target_url,
                timeline_range,
                TimeRange::new(source_start, source_duration),
            );
            if let Some(available) = &reference.available_range {
                clip.source_duration_us = Some(range_to_us(available)?.1);
            }
            clip
        }
        (Some(SCHEMA_GENERATOR_REF), Some(raw)) => {
            let reference: GeneratorReference = serde_json::from_value(raw)?;
            let clip_type = vendor
                .clip_type
                .filter(|t| t.is_virtual())
                .or_else(|| generator_clip_type(&reference.generator_kind))
                .unwrap_or(ClipType::Adjustment);
            let mut clip = Clip::virtual_clip(id, otio.name, clip_type, timeline_range);
            clip.text = string_param(&reference.parameters, PARAM_TEXT);
            clip.background_color = string_param(&reference.parameters, PARAM_BACKGROUND_COLOR);
            clip
        }
        (other, _) => {
            warn!(
                clip = %otio.name,
                reference = other.unwrap_or("<none>"),
                "Skipping clip without a usable media reference"
            );
            return Ok(None);
        }
    };

    clip.is_image = vendor.is_image;
    clip.disabled = vendor.disabled;
    clip.locked = vendor.locked;
    clip.opacity = vendor.opacity;
    clip.effects = vendor.effects;
    clip.speed = vendor.speed;
    clip.transform = vendor.transform;
    clip.audio_gain = vendor.audio_gain;
    clip.audio_balance = vendor.audio_balance;
    clip.audio_fade_in_us = vendor.audio_fade_in_us;
    clip.audio_fade_out_us = vendor.audio_fade_out_us;
    clip.freeze_frame_source_us = vendor.freeze_frame_source_us;
    clip.transition_in = vendor.transition_in;
    clip.transition_out = vendor.transition_out;
    clip.linked_video_clip_id = vendor.linked_video_clip_id;
    clip.audio_from_video_disabled = vendor.audio_from_video_disabled;
    Ok(Some(clip))
}

/// Nested timelines are referenced by their `.otio` file.
fn source_clip_type(target_url: &str) -> ClipType {
    if target_url.to_ascii_lowercase().ends_with(".otio") {
        ClipType::Timeline
    } else {
        ClipType::Media
    }
}

fn generator_clip_type(kind: &str) -> Option<ClipType> {
    serde_json::from_value::<ClipType>(Value::String(kind.to_ascii_lowercase()))
        .ok()
        .filter(|t| t.is_virtual())
}

fn string_param(parameters: &Map<String, Value>, key: &str) -> Option<String> {
    parameters.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Validate structural requirements the engine relies on.
fn validate_document(doc: &TimelineDocument) -> ProjectResult<()> {
    let mut track_ids = HashSet::new();
    for track in &doc.tracks {
        if !track_ids.insert(track.id.as_str()) {
            return Err(invalid(format!("duplicate track id: {}", track.id)));
        }
    }

    let mut item_ids = HashSet::new();
    for item in doc.tracks.iter().flat_map(|t| t.items.iter()) {
        if !item_ids.insert(item.id()) {
            return Err(invalid(format!("duplicate item id: {}", item.id())));
        }
        if item.start_us() < 0 {
            warn!(item_id = %item.id(), start_us = item.start_us(), "Item starts before zero");
        }
    }

    let mut marker_ids = HashSet::new();
    for marker in &doc.metadata.markers {
        if !marker_ids.insert(marker.id.as_str()) {
            return Err(invalid(format!("duplicate marker id: {}", marker.id)));
        }
    }
    Ok(())
}
