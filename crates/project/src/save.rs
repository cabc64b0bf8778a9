//! Timeline serialization: writing a `TimelineDocument` as OTIO JSON.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use sp_timeline::{Clip, Gap, Item, TimelineDocument, Track, TrackKind};
use tracing::{debug, info};

use crate::error::{ProjectError, ProjectResult};
use crate::types::{
    ClipVendor, ExternalReference, GapVendor, GeneratorReference, OtioClip, OtioGap, OtioStack,
    OtioTimeRange, OtioTimeline, OtioTrack, TimelineVendor, TrackVendor, DEFAULT_MEDIA_KEY,
    PARAM_BACKGROUND_COLOR, PARAM_TEXT, SCHEMA_CLIP_V2, SCHEMA_EXTERNAL_REF, SCHEMA_GAP,
    SCHEMA_GENERATOR_REF, SCHEMA_STACK, SCHEMA_TIMELINE, SCHEMA_TRACK, TRACK_KIND_AUDIO,
    TRACK_KIND_VIDEO, VENDOR_KEY,
};

/// Serialize a document to a pretty-printed OTIO JSON string.
///
/// Items are written in timeline order, so a track whose `items` were
/// appended out of order reads back sorted by start time.
pub fn serialize(doc: &TimelineDocument) -> ProjectResult<String> {
    let json = serde_json::to_string_pretty(&to_otio(doc)?)?;
    debug!(
        document_id = %doc.id,
        json_len = json.len(),
        "Serialized timeline to OTIO JSON"
    );
    Ok(json)
}

/// Serialize a document to a compact (non-pretty) OTIO JSON string.
pub fn serialize_compact(doc: &TimelineDocument) -> ProjectResult<String> {
    let json = serde_json::to_string(&to_otio(doc)?)?;
    debug!(
        document_id = %doc.id,
        json_len = json.len(),
        "Serialized timeline to compact OTIO JSON"
    );
    Ok(json)
}

/// Build the OTIO object tree for a document.
pub fn to_otio(doc: &TimelineDocument) -> ProjectResult<OtioTimeline> {
    let vendor = TimelineVendor {
        id: Some(doc.id.clone()),
        fps: Some(doc.fps()),
        markers: doc.metadata.markers.clone(),
        playhead_us: doc.metadata.playhead_us,
        extra: doc.metadata.extra.clone(),
    };

    let children = doc
        .tracks
        .iter()
        .map(|t| to_value(&track_to_otio(t)?))
        .collect::<ProjectResult<Vec<_>>>()?;

    Ok(OtioTimeline {
        schema: SCHEMA_TIMELINE.to_string(),
        name: doc.name.clone(),
        global_start_time: None,
        metadata: vendor_metadata(&vendor)?,
        tracks: OtioStack {
            schema: SCHEMA_STACK.to_string(),
            name: "tracks".to_string(),
            children,
            metadata: Map::new(),
        },
    })
}

fn to_value<T: Serialize>(value: &T) -> ProjectResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// `{ "splice": <vendor> }`.
fn vendor_metadata<T: Serialize>(vendor: &T) -> ProjectResult<Map<String, Value>> {
    let mut metadata = Map::new();
    metadata.insert(VENDOR_KEY.to_string(), to_value(vendor)?);
    Ok(metadata)
}

fn track_to_otio(track: &Track) -> ProjectResult<OtioTrack> {
    let vendor = TrackVendor {
        id: Some(track.id.clone()),
        video_hidden: track.video_hidden,
        audio_muted: track.audio_muted,
        audio_solo: track.audio_solo,
        audio_gain: track.audio_gain,
        audio_balance: track.audio_balance,
        effects: track.effects.clone(),
    };

    // OTIO tracks are sequential: sort by start (stable for equal starts)
    // and pad holes with filler gaps.
    let mut items: Vec<&Item> = track.items.iter().collect();
    items.sort_by_key(|i| i.start_us());

    let mut children = Vec::with_capacity(items.len());
    let mut cursor = 0_i64;
    for item in items {
        let start = item.start_us();
        if start > cursor {
            children.push(to_value(&filler_gap(start - cursor))?);
        }
        children.push(match item {
            Item::Clip(clip) => to_value(&clip_to_otio(clip)?)?,
            Item::Gap(gap) => to_value(&gap_to_otio(gap)?)?,
        });
        cursor = cursor.max(item.end_us());
    }

    let kind = match track.kind {
        TrackKind::Video => TRACK_KIND_VIDEO,
        TrackKind::Audio => TRACK_KIND_AUDIO,
    };

    Ok(OtioTrack {
        schema: SCHEMA_TRACK.to_string(),
        name: track.name.clone(),
        kind: kind.to_string(),
        children,
        metadata: vendor_metadata(&vendor)?,
    })
}

fn filler_gap(duration_us: i64) -> OtioGap {
    OtioGap {
        schema: SCHEMA_GAP.to_string(),
        name: String::new(),
        source_range: OtioTimeRange::from_us(0, duration_us),
        metadata: Map::new(),
    }
}

fn gap_to_otio(gap: &Gap) -> ProjectResult<OtioGap> {
    let vendor = GapVendor {
        id: gap.id.clone(),
        timeline_start_us: Some(gap.timeline_range.start_us),
    };
    Ok(OtioGap {
        schema: SCHEMA_GAP.to_string(),
        name: String::new(),
        source_range: OtioTimeRange::from_us(0, gap.timeline_range.duration_us),
        metadata: vendor_metadata(&vendor)?,
    })
}

fn clip_to_otio(clip: &Clip) -> ProjectResult<OtioClip> {
    let timeline = clip.timeline_range;
    let source_start = clip.source_range.map_or(0, |r| r.start_us);
    let source_range_duration_us = clip
        .source_range
        .map(|r| r.duration_us)
        .filter(|d| *d != timeline.duration_us);

    let vendor = ClipVendor {
        id: Some(clip.id.clone()),
        clip_type: Some(clip.clip_type),
        timeline_start_us: Some(timeline.start_us),
        source_range_duration_us,
        is_image: clip.is_image,
        disabled: clip.disabled,
        locked: clip.locked,
        opacity: clip.opacity,
        effects: clip.effects.clone(),
        speed: clip.speed,
        transform: clip.transform.clone(),
        audio_gain: clip.audio_gain,
        audio_balance: clip.audio_balance,
        audio_fade_in_us: clip.audio_fade_in_us,
        audio_fade_out_us: clip.audio_fade_out_us,
        freeze_frame_source_us: clip.freeze_frame_source_us,
        transition_in: clip.transition_in.clone(),
        transition_out: clip.transition_out.clone(),
        linked_video_clip_id: clip.linked_video_clip_id.clone(),
        audio_from_video_disabled: clip.audio_from_video_disabled,
    };

    let reference = match clip.source_path() {
        Some(path) => to_value(&ExternalReference {
            schema: SCHEMA_EXTERNAL_REF.to_string(),
            target_url: path.to_string(),
            available_range: clip
                .source_duration_us
                .map(|total| OtioTimeRange::from_us(0, total)),
            metadata: Map::new(),
        })?,
        None => to_value(&generator_reference(clip))?,
    };
    let mut media_references = BTreeMap::new();
    media_references.insert(DEFAULT_MEDIA_KEY.to_string(), reference);

    Ok(OtioClip {
        schema: SCHEMA_CLIP_V2.to_string(),
        name: clip.name.clone(),
        source_range: Some(OtioTimeRange::from_us(source_start, timeline.duration_us)),
        media_references: Some(media_references),
        active_media_reference_key: Some(DEFAULT_MEDIA_KEY.to_string()),
        media_reference: None,
        metadata: vendor_metadata(&vendor)?,
    })
}

fn generator_reference(clip: &Clip) -> GeneratorReference {
    let mut parameters = Map::new();
    if let Some(text) = &clip.text {
        parameters.insert(PARAM_TEXT.to_string(), Value::String(text.clone()));
    }
    if let Some(color) = &clip.background_color {
        parameters.insert(PARAM_BACKGROUND_COLOR.to_string(), Value::String(color.clone()));
    }
    GeneratorReference {
        schema: SCHEMA_GENERATOR_REF.to_string(),
        generator_kind: clip.clip_type.as_str().to_string(),
        parameters,
        available_range: None,
        metadata: Map::new(),
    }
}

/// Write `text` to `path` atomically.
///
/// Data is first written to a temporary file in the same directory, then
/// renamed over the target, so a crash mid-write never truncates the file.
pub fn write_atomic(path: &Path, text: &str) -> ProjectResult<()> {
    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    std::fs::write(&temp_path, text.as_bytes()).map_err(|e| {
        tracing::error!(path = %temp_path.display(), error = %e, "Failed to write temp file");
        ProjectError::Io(e)
    })?;

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        tracing::error!(
            from = %temp_path.display(),
            to = %path.display(),
            error = %e,
            "Failed to rename temp file to target"
        );
        ProjectError::Io(e)
    })?;
    Ok(())
}

/// Serialize a document and write it to `path` atomically.
pub fn save_timeline_file(doc: &TimelineDocument, path: &Path) -> ProjectResult<()> {
    let json = serialize(doc)?;
    write_atomic(path, &json)?;
    info!(
        document_id = %doc.id,
        path = %path.display(),
        "Timeline saved successfully"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{schema_of, SCHEMA_KEY};
    use sp_timeline::{ClipType, Marker, TimeRange};

    fn sample_doc() -> TimelineDocument {
        let mut doc = TimelineDocument::fallback("doc_1", "Save Test", 25.0);
        doc.tracks[0].items.push(Item::Clip(Clip::media(
            "c2",
            "b.mp4",
            "media/b.mp4",
            TimeRange::new(3_000_000, 1_000_000),
            TimeRange::new(500_000, 1_000_000),
        )));
        doc.tracks[0].items.push(Item::Clip(Clip::media(
            "c1",
            "a.mp4",
            "media/a.mp4",
            TimeRange::new(1_000_000, 1_000_000),
            TimeRange::new(0, 1_000_000),
        )));
        doc.metadata.markers.push(Marker {
            id: "m1".into(),
            time_us: 2_000_000,
            text: "beat".into(),
        });
        doc
    }

    #[test]
    fn serialize_produces_otio_timeline() {
        let json = serialize(&sample_doc()).expect("serialize");
        let value: Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(value[SCHEMA_KEY], SCHEMA_TIMELINE);
        assert_eq!(value["name"], "Save Test");
        assert_eq!(value["tracks"][SCHEMA_KEY], SCHEMA_STACK);
        assert_eq!(value["metadata"][VENDOR_KEY]["id"], "doc_1");
        assert_eq!(value["metadata"][VENDOR_KEY]["fps"], 25.0);
        assert_eq!(value["metadata"][VENDOR_KEY]["markers"][0]["id"], "m1");
        assert!(json.contains('\n'), "pretty output is multi-line");
    }

    #[test]
    fn track_children_are_sorted_and_padded() {
        let otio = to_otio(&sample_doc()).expect("to_otio");
        let track = &otio.tracks.children[0];
        assert_eq!(track["kind"], TRACK_KIND_VIDEO);
        let children = track["children"].as_array().expect("children");
        let schemas: Vec<&str> = children.iter().filter_map(schema_of).collect();
        // hole [0,1s), c1, hole [2s,3s), c2
        assert_eq!(schemas, vec![SCHEMA_GAP, SCHEMA_CLIP_V2, SCHEMA_GAP, SCHEMA_CLIP_V2]);
        assert!(children[0]["metadata"].as_object().map_or(false, |m| m.is_empty()));
        assert_eq!(children[1]["metadata"][VENDOR_KEY]["id"], "c1");
        assert_eq!(children[2]["source_range"]["duration"]["value"], 1_000_000.0);
        assert_eq!(
            children[3]["source_range"]["start_time"]["value"],
            500_000.0,
            "source start is kept"
        );
    }

    #[test]
    fn virtual_clip_uses_generator_reference() {
        let mut doc = TimelineDocument::fallback("d", "D", 30.0);
        let mut text = Clip::virtual_clip("t1", "Title", ClipType::Text, TimeRange::new(0, 500_000));
        text.text = Some("Hello".into());
        doc.tracks[0].items.push(Item::Clip(text));

        let otio = to_otio(&doc).expect("to_otio");
        let clip = &otio.tracks.children[0]["children"][0];
        let reference = &clip["media_references"][DEFAULT_MEDIA_KEY];
        assert_eq!(reference[SCHEMA_KEY], SCHEMA_GENERATOR_REF);
        assert_eq!(reference["generator_kind"], "text");
        assert_eq!(reference["parameters"][PARAM_TEXT], "Hello");
    }

    #[test]
    fn compact_is_single_line() {
        let json = serialize_compact(&sample_doc()).expect("serialize");
        assert!(!json.contains('\n'));
    }

    #[test]
    fn save_timeline_file_creates_file() {
        let dir = std::env::temp_dir().join("sp_project_save_test");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("timeline.otio");

        save_timeline_file(&sample_doc(), &path).expect("save");
        assert!(path.exists());
        assert!(!dir.join("timeline.otio.tmp").exists());

        let contents = std::fs::read_to_string(&path).expect("read");
        assert!(contents.contains("Timeline.1"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_atomic_to_missing_dir_fails() {
        let path = std::env::temp_dir()
            .join("sp_project_no_such_dir_8c1f")
            .join("timeline.otio");
        let err = write_atomic(&path, "{}").unwrap_err();
        assert!(matches!(err, ProjectError::Io(_)));
    }
}
