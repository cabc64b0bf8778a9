//! Invariant predicates and read-only selectors over a `TimelineDocument`.

use serde::{Deserialize, Serialize};

use crate::types::{Clip, Item, TimeRange, TimelineDocument, Track, TrackKind};

/// What a source file contains, as reported by the media metadata resolver.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub has_video: bool,
    pub has_audio: bool,
    /// Still image: visual, but without a native duration.
    pub is_image: bool,
}

impl SourceInfo {
    pub fn video_with_audio() -> Self {
        Self {
            has_video: true,
            has_audio: true,
            is_image: false,
        }
    }

    pub fn audio_only() -> Self {
        Self {
            has_video: false,
            has_audio: true,
            is_image: false,
        }
    }

    pub fn image() -> Self {
        Self {
            has_video: false,
            has_audio: false,
            is_image: true,
        }
    }

    /// Short human description used in validation messages.
    pub fn describe(&self) -> &'static str {
        match (self.has_video, self.has_audio, self.is_image) {
            (_, _, true) => "an image",
            (true, true, _) => "a video+audio source",
            (true, false, _) => "a video-only source",
            (false, true, _) => "an audio-only source",
            (false, false, _) => "a source with no media streams",
        }
    }
}

/// Whether a track of `kind` may hold a clip of this source.
///
/// Video tracks take anything with a picture (video stream or image).
/// Audio tracks need an audio stream and never take images.
pub fn track_accepts_source(kind: TrackKind, info: &SourceInfo) -> bool {
    match kind {
        TrackKind::Video => info.has_video || info.is_image,
        TrackKind::Audio => info.has_audio && !info.is_image,
    }
}

/// Whether two items occupy overlapping time.
pub fn clips_overlap(a: &Item, b: &Item) -> bool {
    a.timeline_range().overlaps(&b.timeline_range())
}

/// Whether a clip's source range lies inside its source.
///
/// Virtual clips and images have nothing to check. An unknown source
/// duration only constrains the start.
pub fn is_source_range_valid(clip: &Clip) -> bool {
    if !clip.clip_type.has_source() || clip.is_image == Some(true) {
        return true;
    }
    let Some(range) = clip.source_range else {
        return false;
    };
    if range.start_us < 0 || range.duration_us <= 0 {
        return false;
    }
    match clip.source_duration_us {
        Some(total) => range.end_us() <= total,
        None => true,
    }
}

/// First clip on `track` (other than those in `ignore`) whose range overlaps `range`.
pub fn find_overlap<'a>(track: &'a Track, range: &TimeRange, ignore: &[&str]) -> Option<&'a Clip> {
    track
        .clips()
        .filter(|c| !ignore.contains(&c.id.as_str()))
        .find(|c| c.timeline_range.overlaps(range))
}

/// End time of the last item on a track (0 when empty).
pub fn track_end_us(track: &Track) -> i64 {
    track.items.iter().map(Item::end_us).max().unwrap_or(0)
}

/// Max over all tracks of the latest item end time.
pub fn total_duration_us(doc: &TimelineDocument) -> i64 {
    doc.tracks.iter().map(track_end_us).max().unwrap_or(0)
}

pub fn find_track<'a>(doc: &'a TimelineDocument, track_id: &str) -> Option<&'a Track> {
    doc.tracks.iter().find(|t| t.id == track_id)
}

pub fn find_track_index(doc: &TimelineDocument, track_id: &str) -> Option<usize> {
    doc.tracks.iter().position(|t| t.id == track_id)
}

/// Find an item by id across all tracks.
pub fn find_item<'a>(doc: &'a TimelineDocument, item_id: &str) -> Option<(&'a Track, &'a Item)> {
    doc.tracks
        .iter()
        .find_map(|t| t.find_item(item_id).map(|item| (t, item)))
}

/// Find a clip by id across all tracks.
pub fn find_clip<'a>(doc: &'a TimelineDocument, item_id: &str) -> Option<(&'a Track, &'a Clip)> {
    find_item(doc, item_id).and_then(|(t, item)| item.as_clip().map(|c| (t, c)))
}

/// Sorted, deduplicated start/end times of every clip, optionally limited to one track.
pub fn clip_boundaries(doc: &TimelineDocument, track_id: Option<&str>) -> Vec<i64> {
    let mut times: Vec<i64> = doc
        .tracks
        .iter()
        .filter(|t| track_id.map_or(true, |id| t.id == id))
        .flat_map(|t| t.clips())
        .flat_map(|c| [c.timeline_range.start_us, c.timeline_range.end_us()])
        .collect();
    times.sort_unstable();
    times.dedup();
    times
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClipType, Gap};

    fn clip(id: &str, start: i64, dur: i64) -> Item {
        Item::Clip(Clip::media(
            id,
            id,
            "a.mp4",
            TimeRange::new(start, dur),
            TimeRange::new(0, dur),
        ))
    }

    fn doc_with(items_v: Vec<Item>, items_a: Vec<Item>) -> TimelineDocument {
        let mut doc = TimelineDocument::fallback("d", "D", 30.0);
        doc.tracks[0].items = items_v;
        doc.tracks[1].items = items_a;
        doc
    }

    #[test]
    fn track_kind_rules() {
        assert!(track_accepts_source(TrackKind::Video, &SourceInfo::video_with_audio()));
        assert!(track_accepts_source(TrackKind::Video, &SourceInfo::image()));
        assert!(!track_accepts_source(TrackKind::Video, &SourceInfo::audio_only()));
        assert!(track_accepts_source(TrackKind::Audio, &SourceInfo::audio_only()));
        assert!(track_accepts_source(TrackKind::Audio, &SourceInfo::video_with_audio()));
        assert!(!track_accepts_source(TrackKind::Audio, &SourceInfo::image()));
        assert!(!track_accepts_source(TrackKind::Audio, &SourceInfo::default()));
    }

    #[test]
    fn overlap_is_geometric_not_positional() {
        let a = clip("a", 0, 100);
        let b = clip("b", 100, 100);
        let c = clip("c", 50, 10);
        assert!(!clips_overlap(&a, &b));
        assert!(clips_overlap(&a, &c));
        assert!(clips_overlap(&c, &a));
    }

    #[test]
    fn source_range_validity() {
        let Item::Clip(mut c) = clip("a", 0, 100) else {
            unreachable!()
        };
        c.source_duration_us = Some(100);
        assert!(is_source_range_valid(&c));
        c.source_range = Some(TimeRange::new(10, 100));
        assert!(!is_source_range_valid(&c));
        c.is_image = Some(true);
        assert!(is_source_range_valid(&c));

        let text = Clip::virtual_clip("t", "T", ClipType::Text, TimeRange::new(0, 5));
        assert!(is_source_range_valid(&text));
    }

    #[test]
    fn selectors() {
        let doc = doc_with(
            vec![clip("a", 0, 100), clip("b", 300, 50)],
            vec![
                clip("c", 20, 500),
                Item::Gap(Gap {
                    id: "g".into(),
                    timeline_range: TimeRange::new(520, 30),
                }),
            ],
        );
        assert_eq!(total_duration_us(&doc), 550);
        assert_eq!(find_item(&doc, "c").map(|(t, _)| t.id.as_str()), Some("track_audio_1"));
        assert!(find_clip(&doc, "g").is_none());
        assert!(find_item(&doc, "zzz").is_none());
        assert_eq!(clip_boundaries(&doc, None), vec![0, 20, 100, 300, 350, 520]);
        assert_eq!(clip_boundaries(&doc, Some("track_video_1")), vec![0, 100, 300, 350]);
        assert_eq!(total_duration_us(&TimelineDocument::new("e", "E", 30.0)), 0);
    }

    #[test]
    fn find_overlap_respects_ignore_list() {
        let doc = doc_with(vec![clip("a", 0, 100)], vec![]);
        let track = &doc.tracks[0];
        let range = TimeRange::new(50, 100);
        assert_eq!(find_overlap(track, &range, &[]).map(|c| c.id.as_str()), Some("a"));
        assert!(find_overlap(track, &range, &["a"]).is_none());
    }
}
