//! Timeline document model: tracks, items (clips and gaps), transitions, markers.
//!
//! A `TimelineDocument` is immutable once it has been observed by history:
//! every command produces a new value, and the previous one is kept only as
//! an undo snapshot. Item order inside `Track::items` carries no meaning;
//! placement is defined by each item's `timeline_range`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A half-open time interval `[start_us, start_us + duration_us)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_us: i64,
    pub duration_us: i64,
}

impl TimeRange {
    pub fn new(start_us: i64, duration_us: i64) -> Self {
        Self {
            start_us,
            duration_us,
        }
    }

    pub fn end_us(&self) -> i64 {
        self.start_us + self.duration_us
    }

    /// True if `time_us` lies strictly inside the range (not on either edge).
    pub fn strictly_contains(&self, time_us: i64) -> bool {
        time_us > self.start_us && time_us < self.end_us()
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start_us < other.end_us() && other.start_us < self.end_us()
    }

    pub fn centre_us(&self) -> i64 {
        self.start_us + self.duration_us / 2
    }
}

/// Frame rate used to quantize cut points.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Timebase {
    pub fps: f64,
}

impl Default for Timebase {
    fn default() -> Self {
        Self { fps: 30.0 }
    }
}

/// The complete editable timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDocument {
    /// Stable for the lifetime of the document.
    pub id: String,
    pub name: String,
    pub timebase: Timebase,
    /// Tracks in display order.
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl TimelineDocument {
    /// Create a document with no tracks.
    pub fn new(id: impl Into<String>, name: impl Into<String>, fps: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            timebase: Timebase { fps },
            tracks: Vec::new(),
            metadata: DocumentMetadata::default(),
        }
    }

    /// The document used when no timeline file exists yet: one video track
    /// and one audio track, both empty.
    pub fn fallback(id: impl Into<String>, name: impl Into<String>, fps: f64) -> Self {
        let mut doc = Self::new(id, name, fps);
        doc.tracks.push(Track::new("track_video_1", TrackKind::Video, "Video 1"));
        doc.tracks.push(Track::new("track_audio_1", TrackKind::Audio, "Audio 1"));
        doc
    }

    pub fn fps(&self) -> f64 {
        self.timebase.fps
    }
}

/// Document-level metadata. Unknown keys are preserved in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playhead_us: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Track type: constrains which sources may populate it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

/// A track holding an unordered set of items keyed by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub kind: TrackKind,
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
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

impl Track {
    pub fn new(id: impl Into<String>, kind: TrackKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            items: Vec::new(),
            video_hidden: None,
            audio_muted: None,
            audio_solo: None,
            audio_gain: None,
            audio_balance: None,
            effects: None,
        }
    }

    pub fn find_item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id() == item_id)
    }

    pub fn find_item_mut(&mut self, item_id: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id() == item_id)
    }

    /// Clips on this track, in array order.
    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.items.iter().filter_map(Item::as_clip)
    }
}

/// An item placed on a track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Item {
    Clip(Clip),
    Gap(Gap),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Clip(c) => &c.id,
            Item::Gap(g) => &g.id,
        }
    }

    pub fn timeline_range(&self) -> TimeRange {
        match self {
            Item::Clip(c) => c.timeline_range,
            Item::Gap(g) => g.timeline_range,
        }
    }

    pub fn start_us(&self) -> i64 {
        self.timeline_range().start_us
    }

    pub fn end_us(&self) -> i64 {
        self.timeline_range().end_us()
    }

    pub fn set_start_us(&mut self, start_us: i64) {
        match self {
            Item::Clip(c) => c.timeline_range.start_us = start_us,
            Item::Gap(g) => g.timeline_range.start_us = start_us,
        }
    }

    pub fn as_clip(&self) -> Option<&Clip> {
        match self {
            Item::Clip(c) => Some(c),
            Item::Gap(_) => None,
        }
    }

    pub fn as_clip_mut(&mut self) -> Option<&mut Clip> {
        match self {
            Item::Clip(c) => Some(c),
            Item::Gap(_) => None,
        }
    }
}

/// Empty placeholder occupying track time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    pub id: String,
    pub timeline_range: TimeRange,
}

/// What a clip plays.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipType {
    /// A media file.
    Media,
    /// Another timeline document, nested.
    Timeline,
    Adjustment,
    Background,
    Text,
}

impl ClipType {
    /// Media and timeline clips reference a source and carry a source range.
    pub fn has_source(self) -> bool {
        matches!(self, ClipType::Media | ClipType::Timeline)
    }

    pub fn is_virtual(self) -> bool {
        !self.has_source()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClipType::Media => "media",
            ClipType::Timeline => "timeline",
            ClipType::Adjustment => "adjustment",
            ClipType::Background => "background",
            ClipType::Text => "text",
        }
    }
}

/// Source file reference, project-relative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    pub path: String,
}

/// Transition attached to one edge of a clip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipTransition {
    #[serde(rename = "type")]
    pub kind: String,
    pub duration_us: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl ClipTransition {
    pub fn new(kind: impl Into<String>, duration_us: i64) -> Self {
        Self {
            kind: kind.into(),
            duration_us,
            params: BTreeMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Effect applied to a clip or track. Parameters are opaque to the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
}

fn default_scale() -> f64 {
    1.0
}

/// 2D placement of a visual clip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipTransform {
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
    #[serde(default)]
    pub rotation_deg: f64,
}

impl Default for ClipTransform {
    fn default() -> Self {
        Self {
            position_x: 0.0,
            position_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation_deg: 0.0,
        }
    }
}

/// A timed reference to a source (or virtual content) placed on a track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub clip_type: ClipType,
    pub timeline_range: TimeRange,
    /// Portion of the source played; `Some` for media/timeline clips only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_range: Option<TimeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MediaSource>,
    /// Full source length, used to clamp trims. `None` until known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_duration_us: Option<i64>,
    /// Still images have no native length and are never clamped.
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
    /// Set on an extracted audio clip: the video clip it was taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_video_clip_id: Option<String>,
    /// Set on a video clip whose audio now lives on an audio track.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_from_video_disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl Clip {
    fn bare(id: String, name: String, clip_type: ClipType, timeline_range: TimeRange) -> Self {
        Self {
            id,
            name,
            clip_type,
            timeline_range,
            source_range: None,
            source: None,
            source_duration_us: None,
            is_image: None,
            disabled: None,
            locked: None,
            opacity: None,
            effects: None,
            speed: None,
            transform: None,
            audio_gain: None,
            audio_balance: None,
            audio_fade_in_us: None,
            audio_fade_out_us: None,
            freeze_frame_source_us: None,
            transition_in: None,
            transition_out: None,
            linked_video_clip_id: None,
            audio_from_video_disabled: None,
            text: None,
            background_color: None,
        }
    }

    /// A media clip playing `source_range` of the file at `path`.
    pub fn media(
        id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        timeline_range: TimeRange,
        source_range: TimeRange,
    ) -> Self {
        let mut clip = Self::bare(id.into(), name.into(), ClipType::Media, timeline_range);
        clip.source = Some(MediaSource { path: path.into() });
        clip.source_range = Some(source_range);
        clip
    }

    /// A source-backed clip of the given type (media or nested timeline).
    pub fn sourced(
        id: impl Into<String>,
        name: impl Into<String>,
        clip_type: ClipType,
        path: impl Into<String>,
        timeline_range: TimeRange,
        source_range: TimeRange,
    ) -> Self {
        let mut clip = Self::media(id, name, path, timeline_range, source_range);
        clip.clip_type = clip_type;
        clip
    }

    /// An adjustment, background, or text clip.
    pub fn virtual_clip(
        id: impl Into<String>,
        name: impl Into<String>,
        clip_type: ClipType,
        timeline_range: TimeRange,
    ) -> Self {
        Self::bare(id.into(), name.into(), clip_type, timeline_range)
    }

    /// Playback rate; missing or non-positive speeds read as 1.0.
    pub fn speed_factor(&self) -> f64 {
        match self.speed {
            Some(s) if s > 0.0 => s,
            _ => 1.0,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }

    pub fn source_path(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.path.as_str())
    }

    /// Map a timeline-duration delta onto the source at this clip's speed.
    pub fn to_source_delta(&self, timeline_delta_us: i64) -> i64 {
        (timeline_delta_us as f64 * self.speed_factor()).round() as i64
    }
}

/// A user-placed marker, stored under `metadata.markers`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub time_us: i64,
    #[serde(default)]
    pub text: String,
}
