//! Interchange data model types: OpenTimelineIO-compatible JSON.
//!
//! These types match the OTIO JSON schemas (`Timeline.1`, `Stack.1`,
//! `Track.1`, `Clip.2`, `Gap.1`, `RationalTime.1`, ...), so files written
//! here open in other OTIO tools. Everything OTIO has no field for is kept
//! in each object's `metadata` under the [`VENDOR_KEY`] namespace.
//!
//! Stack and track children are kept as raw `serde_json::Value`s and
//! dispatched on their `OTIO_SCHEMA` tag by the loader, so unknown child
//! schemas can be skipped instead of failing the whole document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sp_timeline::{ClipTransform, ClipTransition, ClipType, Effect, Marker};

/// JSON key holding an object's schema name and version.
pub const SCHEMA_KEY: &str = "OTIO_SCHEMA";
/// Namespace for our fields inside OTIO `metadata` maps.
pub const VENDOR_KEY: &str = "splice";
/// Key of the single entry in a `Clip.2` `media_references` map.
pub const DEFAULT_MEDIA_KEY: &str = "DEFAULT_MEDIA";
/// Rate used when writing `RationalTime` values: one unit per microsecond.
pub const MICROSECOND_RATE: f64 = 1_000_000.0;

pub const SCHEMA_TIMELINE: &str = "Timeline.1";
pub const SCHEMA_STACK: &str = "Stack.1";
pub const SCHEMA_TRACK: &str = "Track.1";
pub const SCHEMA_CLIP_V1: &str = "Clip.1";
pub const SCHEMA_CLIP_V2: &str = "Clip.2";
pub const SCHEMA_GAP: &str = "Gap.1";
pub const SCHEMA_TIME_RANGE: &str = "TimeRange.1";
pub const SCHEMA_RATIONAL_TIME: &str = "RationalTime.1";
pub const SCHEMA_EXTERNAL_REF: &str = "ExternalReference.1";
pub const SCHEMA_GENERATOR_REF: &str = "GeneratorReference.1";
pub const SCHEMA_MISSING_REF: &str = "MissingReference.1";

pub const TRACK_KIND_VIDEO: &str = "Video";
pub const TRACK_KIND_AUDIO: &str = "Audio";

/// A time value: `value / rate` seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RationalTime {
    #[serde(rename = "OTIO_SCHEMA")]
    pub schema: String,
    pub rate: f64,
    pub value: f64,
}

impl RationalTime {
    pub fn from_us(us: i64) -> Self {
        Self {
            schema: SCHEMA_RATIONAL_TIME.to_string(),
            rate: MICROSECOND_RATE,
            value: us as f64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OtioTimeRange {
    #[serde(rename = "OTIO_SCHEMA")]
    pub schema: String,
    pub start_time: RationalTime,
    pub duration: RationalTime,
}

impl OtioTimeRange {
    pub fn from_us(start_us: i64, duration_us: i64) -> Self {
        Self {
            schema: SCHEMA_TIME_RANGE.to_string(),
            start_time: RationalTime::from_us(start_us),
            duration: RationalTime::from_us(duration_us),
        }
    }
}

/// Top-level `Timeline.1` object.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OtioTimeline {
    #[serde(rename = "OTIO_SCHEMA")]
    pub schema: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub global_start_time: Option<RationalTime>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub tracks: OtioStack,
}

/// `Stack.1`: the timeline's track container.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OtioStack {
    #[serde(rename = "OTIO_SCHEMA")]
    pub schema: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub children: Vec<Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// `Track.1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OtioTrack {
    #[serde(rename = "OTIO_SCHEMA")]
    pub schema: String,
    #[serde(default)]
    pub name: String,
    /// `"Video"` or `"Audio"`.
    pub kind: String,
    #[serde(default)]
    pub children: Vec<Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// `Clip.2` (and the older `Clip.1`, which has a single `media_reference`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OtioClip {
    #[serde(rename = "OTIO_SCHEMA")]
    pub schema: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source_range: Option<OtioTimeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_references: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_media_reference_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_reference: Option<Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// `Gap.1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OtioGap {
    #[serde(rename = "OTIO_SCHEMA")]
    pub schema: String,
    #[serde(default)]
    pub name: String,
    pub source_range: OtioTimeRange,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// `ExternalReference.1`: a file on disk, project-relative.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalReference {
    #[serde(rename = "OTIO_SCHEMA")]
    pub schema: String,
    pub target_url: String,
    #[serde(default)]
    pub available_range: Option<OtioTimeRange>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// `GeneratorReference.1`: content synthesized at render time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratorReference {
    #[serde(rename = "OTIO_SCHEMA")]
    pub schema: String,
    pub generator_kind: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub available_range: Option<OtioTimeRange>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Generator parameter keys for virtual clips.
pub const PARAM_TEXT: &str = "text";
pub const PARAM_BACKGROUND_COLOR: &str = "backgroundColor";

/// Document fields stored under `Timeline.1 metadata.splice`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineVendor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playhead_us: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Track fields stored under `Track.1 metadata.splice`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackVendor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_solo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Vec<Effect>>,
}

/// Clip fields stored under `Clip.2 metadata.splice`.
///
/// The OTIO `source_range` carries the source start and the clip's length
/// on the timeline. `timeline_start_us` pins the placement so layouts that
/// break OTIO's strictly sequential model (overlaps) restore exactly, and
/// `source_range_duration_us` is written when speed makes the source span
/// differ from the timeline length.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipVendor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_type: Option<ClipType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_start_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_range_duration_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_image: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Vec<Effect>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<ClipTransform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_gain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_fade_in_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_fade_out_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_frame_source_us: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_in: Option<ClipTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_out: Option<ClipTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_video_clip_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_from_video_disabled: Option<bool>,
}

/// Gap fields stored under `Gap.1 metadata.splice`. Filler gaps written
/// to pad holes between items have no vendor entry at all.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapVendor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_start_us: Option<i64>,
}

/// Identity used when the text carries none, and the document substituted
/// when it cannot be read at all.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentDefaults {
    pub id: String,
    pub name: String,
    pub fps: f64,
}

impl DocumentDefaults {
    pub fn new(id: impl Into<String>, name: impl Into<String>, fps: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fps,
        }
    }
}

/// Read the `OTIO_SCHEMA` tag of a raw JSON object.
pub fn schema_of(value: &Value) -> Option<&str> {
    value.get(SCHEMA_KEY).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_time_writes_microsecond_rate() {
        let json = serde_json::to_value(RationalTime::from_us(1_500_000)).expect("serialize");
        assert_eq!(json[SCHEMA_KEY], SCHEMA_RATIONAL_TIME);
        assert_eq!(json["rate"], 1_000_000.0);
        assert_eq!(json["value"], 1_500_000.0);
    }

    #[test]
    fn vendor_structs_omit_unset_fields() {
        let vendor = ClipVendor {
            id: Some("c1".into()),
            timeline_start_us: Some(0),
            ..Default::default()
        };
        let json = serde_json::to_value(&vendor).expect("serialize");
        let obj = json.as_object().expect("object");
        assert_eq!(obj.len(), 2);
        assert_eq!(json["timelineStartUs"], 0);
    }

    #[test]
    fn schema_of_reads_tag() {
        let v = serde_json::json!({"OTIO_SCHEMA": "Gap.1"});
        assert_eq!(schema_of(&v), Some(SCHEMA_GAP));
        assert_eq!(schema_of(&serde_json::json!({})), None);
    }
}
