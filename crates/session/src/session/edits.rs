//! Composite edits built from engine primitives: playhead split, trim to
//! playhead (with ripple), ripple delete, boundary jumps, and just-in-time
//! source hydration.

use std::sync::Arc;

use sp_common::new_id;
use sp_timeline::{
    clip_boundaries, find_clip, find_track, total_duration_us, ClipType, Item, SourceInfo,
    TimelineCommand, TimelineError, TrimEdge,
};
use tracing::{debug, warn};

use super::{ApplyMode, EditSession};
use crate::error::{SessionError, SessionResult};

/// Length given to stills, which have no duration of their own.
const STILL_DURATION_US: i64 = 5_000_000;

/// Which part of a clip a trim-to-playhead discards.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrimSide {
    /// Everything before the playhead.
    Left,
    /// Everything after the playhead.
    Right,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JumpDirection {
    Previous,
    Next,
}

fn is_nested_timeline(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".otio")
}

impl EditSession {
    /// Add a source file to a track, sized and kind-checked from what the
    /// metadata resolver reports (or, for `.otio` files, from the nested
    /// timeline's duration). Returns the new clip id.
    pub fn add_clip_from_path(
        &mut self,
        track_id: &str,
        path: &str,
        start_us: Option<i64>,
    ) -> SessionResult<String> {
        let item_id = new_id("clip");
        let command = if is_nested_timeline(path) {
            let duration_us = self.nested_timeline_duration(path)?;
            if duration_us <= 0 {
                return Err(SessionError::InvalidRange {
                    start_us: 0,
                    end_us: duration_us,
                });
            }
            TimelineCommand::AddClipToTrack {
                track_id: track_id.to_string(),
                item_id: Some(item_id.clone()),
                clip_type: ClipType::Timeline,
                name: None,
                path: path.to_string(),
                start_us,
                duration_us,
                source_start_us: 0,
                source_duration_us: Some(duration_us),
                source_info: None,
            }
        } else {
            let meta = self
                .metadata
                .lookup_metadata(path)
                .ok_or_else(|| SessionError::MetadataUnavailable {
                    path: path.to_string(),
                })?;
            let source_duration_us = meta.source_duration_us(path);
            TimelineCommand::AddClipToTrack {
                track_id: track_id.to_string(),
                item_id: Some(item_id.clone()),
                clip_type: ClipType::Media,
                name: None,
                path: path.to_string(),
                start_us,
                duration_us: source_duration_us.unwrap_or(STILL_DURATION_US),
                source_start_us: 0,
                source_duration_us,
                source_info: Some(meta.source_info(path)),
            }
        };
        self.apply_timeline(command, ApplyMode::default())?;
        Ok(item_id)
    }

    /// Split clips under the playhead: the selected ones if any selected
    /// clip is there, otherwise every clip on every track. Returns the
    /// number of clips split.
    pub fn split_at_playhead(&mut self) -> SessionResult<usize> {
        let at_us = self.quantized_playhead_us();
        let doc = Arc::clone(&self.document);

        let under_playhead: Vec<(&str, &str)> = doc
            .tracks
            .iter()
            .flat_map(|t| {
                t.clips()
                    .filter(|c| !c.is_locked() && c.timeline_range.strictly_contains(at_us))
                    .map(move |c| (t.id.as_str(), c.id.as_str()))
            })
            .collect();
        let selection = &self.state.selection;
        let selected: Vec<(&str, &str)> = under_playhead
            .iter()
            .copied()
            .filter(|(track_id, item_id)| selection.is_item_selected(track_id, item_id))
            .collect();
        let targets = if selected.is_empty() {
            under_playhead
        } else {
            selected
        };
        if targets.is_empty() {
            return Ok(0);
        }

        let commands = targets
            .iter()
            .map(|(track_id, item_id)| TimelineCommand::SplitItem {
                track_id: track_id.to_string(),
                item_id: item_id.to_string(),
                at_us,
                new_item_id: None,
            })
            .collect();
        self.apply_sequence(commands, "Split clip", ApplyMode::default())?;
        Ok(targets.len())
    }

    /// The clip a playhead trim acts on: a selected clip under the cut,
    /// else the first clip under it in track order.
    fn trim_target(&self, cut_us: i64) -> Option<(String, String)> {
        let candidates = || {
            self.document.tracks.iter().flat_map(move |t| {
                t.clips()
                    .filter(move |c| !c.is_locked() && c.timeline_range.strictly_contains(cut_us))
                    .map(move |c| (t.id.clone(), c.id.clone()))
            })
        };
        let selection = &self.state.selection;
        candidates()
            .find(|(track_id, item_id)| selection.is_item_selected(track_id, item_id))
            .or_else(|| candidates().next())
    }

    /// Cut a clip at the playhead and discard one side. With `ripple`, the
    /// clip and everything after it on its track close the resulting hole.
    /// Returns false when no clip lies under the playhead.
    pub fn trim_to_playhead(&mut self, side: TrimSide, ripple: bool) -> SessionResult<bool> {
        let cut_us = self.quantized_playhead_us();
        let Some((track_id, item_id)) = self.trim_target(cut_us) else {
            return Ok(false);
        };
        if let Err(e) = self.hydrate_clip_source(&item_id) {
            warn!(item_id = %item_id, error = %e, "Trimming without source information");
        }

        let original = match find_clip(&self.document, &item_id) {
            Some((_, clip)) => clip.timeline_range,
            None => return Err(SessionError::ItemNotFound { item_id }),
        };
        let (edge, delta_us) = match side {
            TrimSide::Left => (TrimEdge::Start, cut_us - original.start_us),
            TrimSide::Right => (TrimEdge::End, cut_us - original.end_us()),
        };

        let mut draft = self.draft();
        draft.apply(TimelineCommand::TrimItem {
            track_id: track_id.clone(),
            item_id: item_id.clone(),
            edge,
            delta_us,
        })?;

        if ripple {
            let trimmed_us = find_clip(draft.document(), &item_id)
                .map_or(0, |(_, c)| original.duration_us - c.timeline_range.duration_us);
            if trimmed_us > 0 {
                let epsilon = self.config.ripple_epsilon_us;
                let track = find_track(draft.document(), &track_id).ok_or_else(|| {
                    TimelineError::TrackNotFound {
                        track_id: track_id.clone(),
                    }
                })?;
                let mut shifted: Vec<(i64, String)> = track
                    .items
                    .iter()
                    .filter(|item| {
                        (side == TrimSide::Left && item.id() == item_id)
                            || (item.id() != item_id
                                && item.start_us() >= original.end_us() - epsilon)
                    })
                    .map(|item| (item.start_us(), item.id().to_string()))
                    .collect();
                shifted.sort();
                for (start_us, id) in shifted {
                    draft.apply(TimelineCommand::MoveItem {
                        track_id: track_id.clone(),
                        item_id: id,
                        start_us: start_us - trimmed_us,
                    })?;
                }
            }
        }

        let label = if ripple { "Ripple trim" } else { "Trim clip" };
        let changed = self.commit_draft(draft, label, "trim_to_playhead", ApplyMode::default());
        if changed && ripple && side == TrimSide::Left {
            self.set_playhead(original.start_us);
        }
        Ok(changed)
    }

    /// Remove `[start_us, end_us)` from the given tracks (the selected
    /// tracks, or all of them, when `None`) and pull later items left to
    /// close the hole. Items starting within the ripple epsilon of
    /// `end_us` count as later items and move whole.
    pub fn ripple_delete_range(
        &mut self,
        start_us: i64,
        end_us: i64,
        track_ids: Option<Vec<String>>,
    ) -> SessionResult<bool> {
        if start_us < 0 || end_us <= start_us {
            return Err(SessionError::InvalidRange { start_us, end_us });
        }
        let track_ids = match track_ids {
            Some(ids) => ids,
            None if !self.state.selection.selected_tracks().is_empty() => {
                self.state.selection.selected_tracks().to_vec()
            }
            None => self.document.tracks.iter().map(|t| t.id.clone()).collect(),
        };
        let length_us = end_us - start_us;
        let epsilon = self.config.ripple_epsilon_us;

        let mut draft = self.draft();
        for track_id in &track_ids {
            let items_where = |draft: &super::Draft, keep: &dyn Fn(&Item) -> bool| -> SessionResult<Vec<Item>> {
                let track = find_track(draft.document(), track_id).ok_or_else(|| {
                    TimelineError::TrackNotFound {
                        track_id: track_id.clone(),
                    }
                })?;
                Ok(track.items.iter().filter(|&i| keep(i)).cloned().collect())
            };

            // A boundary within epsilon of an item edge is rounding noise, not a cut.
            for boundary in [start_us, end_us] {
                for item in items_where(&draft, &|i: &Item| {
                    let range = i.timeline_range();
                    boundary - range.start_us > epsilon && range.end_us() - boundary > epsilon
                })? {
                    draft.apply(TimelineCommand::SplitItem {
                        track_id: track_id.clone(),
                        item_id: item.id().to_string(),
                        at_us: boundary,
                        new_item_id: None,
                    })?;
                }
            }

            let doomed: Vec<String> = items_where(&draft, &|i: &Item| {
                let centre = i.timeline_range().centre_us();
                centre >= start_us && centre < end_us
            })?
            .iter()
            .map(|i| i.id().to_string())
            .collect();
            if !doomed.is_empty() {
                draft.apply(TimelineCommand::DeleteItems {
                    track_id: track_id.clone(),
                    item_ids: doomed,
                })?;
            }

            let mut later: Vec<(i64, String)> = items_where(&draft, &|i: &Item| i.start_us() >= end_us - epsilon)?
                .iter()
                .map(|i| (i.start_us(), i.id().to_string()))
                .collect();
            later.sort();
            for (item_start_us, item_id) in later {
                draft.apply(TimelineCommand::MoveItem {
                    track_id: track_id.clone(),
                    item_id,
                    start_us: (item_start_us - length_us).max(start_us),
                })?;
            }
        }

        let changed = self.commit_draft(draft, "Ripple delete", "ripple_delete_range", ApplyMode::default());
        if changed {
            let playhead = self.state.playhead_us;
            if playhead >= end_us {
                self.set_playhead(playhead - length_us);
            } else if playhead > start_us {
                self.set_playhead(start_us);
            }
        }
        Ok(changed)
    }

    /// Delete every selected item. Returns how many were selected.
    pub fn delete_selection(&mut self) -> SessionResult<usize> {
        let selected = self.state.selection.selected_items().to_vec();
        if selected.is_empty() {
            return Ok(0);
        }
        let mut by_track: Vec<(String, Vec<String>)> = Vec::new();
        for item in &selected {
            match by_track.iter_mut().find(|(track_id, _)| *track_id == item.track_id) {
                Some((_, ids)) => ids.push(item.item_id.clone()),
                None => by_track.push((item.track_id.clone(), vec![item.item_id.clone()])),
            }
        }
        let commands = by_track
            .into_iter()
            .map(|(track_id, item_ids)| TimelineCommand::DeleteItems { track_id, item_ids })
            .collect();
        self.apply_sequence(commands, "Delete clips", ApplyMode::default())?;
        Ok(selected.len())
    }

    /// Move the playhead to the nearest clip start or end strictly before
    /// or after it, optionally considering one track only. Past the last
    /// boundary the playhead goes to zero or to the document end.
    pub fn jump_to_clip_boundary(&mut self, direction: JumpDirection, track_id: Option<&str>) -> i64 {
        let boundaries = clip_boundaries(&self.document, track_id);
        let now = self.state.playhead_us;
        let target = match direction {
            JumpDirection::Previous => boundaries.iter().rev().copied().find(|b| *b < now).unwrap_or(0),
            JumpDirection::Next => boundaries
                .iter()
                .copied()
                .find(|b| *b > now)
                .unwrap_or(self.state.duration_us),
        };
        self.set_playhead(target);
        self.state.playhead_us
    }

    /// Fill in what the metadata resolver knows before a command reaches
    /// the engine: stream flags for track-kind and audio checks, and the
    /// clip's true source length ahead of a trim.
    pub(super) fn with_source_info(&mut self, mut command: TimelineCommand) -> TimelineCommand {
        match &mut command {
            TimelineCommand::AddClipToTrack {
                clip_type: ClipType::Media,
                path,
                source_duration_us,
                source_info,
                ..
            } if source_info.is_none() => {
                if let Some(meta) = self.metadata.lookup_metadata(path) {
                    *source_info = Some(meta.source_info(path));
                    if source_duration_us.is_none() {
                        *source_duration_us = meta.source_duration_us(path);
                    }
                }
            }
            TimelineCommand::MoveItemToTrack {
                item_id, source_info, ..
            }
            | TimelineCommand::ExtractAudioToTrack {
                item_id, source_info, ..
            } if source_info.is_none() => {
                *source_info = self.clip_source_info(item_id);
            }
            TimelineCommand::TrimItem { item_id, .. } => {
                if let Err(e) = self.hydrate_clip_source(item_id) {
                    debug!(item_id = %item_id, error = %e, "Trimming without source information");
                }
            }
            _ => {}
        }
        command
    }

    /// Stream flags of a media clip already on the timeline.
    fn clip_source_info(&self, item_id: &str) -> Option<SourceInfo> {
        let (_, clip) = find_clip(&self.document, item_id)?;
        if clip.clip_type != ClipType::Media {
            return None;
        }
        let path = clip.source_path()?;
        self.metadata
            .lookup_metadata(path)
            .map(|meta| meta.source_info(path))
    }

    /// Record a clip's true source length and image flag, from the
    /// metadata resolver or, for nested timelines, by reading the nested
    /// file. Not undoable. Returns true if the clip changed.
    pub fn hydrate_clip_source(&mut self, item_id: &str) -> SessionResult<bool> {
        let Some((track, clip)) = find_clip(&self.document, item_id) else {
            return Err(SessionError::ItemNotFound {
                item_id: item_id.to_string(),
            });
        };
        let Some(path) = clip.source_path().map(str::to_string) else {
            return Ok(false);
        };
        let track_id = track.id.clone();
        let clip_type = clip.clip_type;

        let (source_duration_us, is_image) = match clip_type {
            ClipType::Timeline => (Some(self.nested_timeline_duration(&path)?), Some(false)),
            _ => match self.metadata.lookup_metadata(&path) {
                Some(meta) => (meta.source_duration_us(&path), Some(meta.source_info(&path).is_image)),
                None => {
                    debug!(path = %path, "No metadata to hydrate clip with");
                    return Ok(false);
                }
            },
        };

        self.apply_timeline(
            TimelineCommand::UpdateClipSourceInfo {
                track_id,
                item_id: item_id.to_string(),
                source_duration_us: source_duration_us.filter(|d| *d > 0),
                is_image,
            },
            ApplyMode::silent(),
        )
    }

    /// Duration of a nested timeline file, read through storage.
    fn nested_timeline_duration(&self, path: &str) -> SessionResult<i64> {
        let handle = self
            .storage
            .get_file_handle(path, false)?
            .ok_or_else(|| SessionError::MetadataUnavailable {
                path: path.to_string(),
            })?;
        let text = self.storage.read_text(&handle)?;
        let nested = sp_project::try_parse(&text, &self.defaults)?;
        Ok(total_duration_us(&nested))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MediaMetadata, MetadataTable};
    use crate::session::SessionOptions;
    use crate::storage::MemoryStorage;
    use sp_app_state::ManualClock;
    use sp_common::{EditorConfig, OverlapPolicy};
    use sp_project::DocumentDefaults;
    use sp_timeline::{Clip, TimeRange};

    const V: &str = "track_video_1";
    const A: &str = "track_audio_1";

    fn session_with(storage: MemoryStorage, metadata: MetadataTable) -> EditSession {
        EditSession::new(
            Arc::new(storage),
            Arc::new(metadata),
            Arc::new(ManualClock::new()),
            SessionOptions::new("timeline.otio", DocumentDefaults::new("doc", "Main", 30.0)),
        )
    }

    fn session() -> EditSession {
        session_with(MemoryStorage::new(), MetadataTable::new())
    }

    fn session_allowing_overlaps() -> EditSession {
        let config = EditorConfig {
            overlap_policy: OverlapPolicy::Allow,
            ..EditorConfig::default()
        };
        EditSession::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MetadataTable::new()),
            Arc::new(ManualClock::new()),
            SessionOptions::new("timeline.otio", DocumentDefaults::new("doc", "Main", 30.0))
                .with_config(config),
        )
    }

    fn place(s: &mut EditSession, track_id: &str, id: &str, start_us: i64, duration_us: i64) {
        s.apply_timeline(
            TimelineCommand::AddClipToTrack {
                track_id: track_id.into(),
                item_id: Some(id.into()),
                clip_type: ClipType::Media,
                name: None,
                path: "m.mp4".into(),
                start_us: Some(start_us),
                duration_us,
                source_start_us: 0,
                source_duration_us: Some(60_000_000),
                source_info: None,
            },
            ApplyMode::default(),
        )
        .unwrap();
    }

    fn range_of(s: &EditSession, id: &str) -> TimeRange {
        find_clip(s.document(), id).unwrap().1.timeline_range
    }

    #[test]
    fn split_at_playhead_prefers_selection() {
        let mut s = session();
        place(&mut s, V, "v", 0, 3_000_000);
        place(&mut s, A, "a", 0, 3_000_000);
        s.set_playhead(1_000_000);
        s.select_item(A, "a", false);

        assert_eq!(s.split_at_playhead().unwrap(), 1);
        assert_eq!(s.document().tracks[0].items.len(), 1);
        assert_eq!(s.document().tracks[1].items.len(), 2);

        s.clear_selection();
        s.set_playhead(2_000_000);
        assert_eq!(s.split_at_playhead().unwrap(), 2);
    }

    #[test]
    fn split_at_playhead_snaps_to_frames() {
        let mut s = session();
        place(&mut s, V, "v", 0, 3_000_000);
        // 1.01 s at 30 fps is frame 30.3, which rounds to frame 30 = 1 s.
        s.set_playhead(1_010_000);
        s.split_at_playhead().unwrap();
        assert_eq!(range_of(&s, "v"), TimeRange::new(0, 1_000_000));
    }

    #[test]
    fn trim_right_with_ripple_closes_the_hole() {
        let mut s = session();
        place(&mut s, V, "a", 0, 3_000_000);
        place(&mut s, V, "b", 3_000_000, 1_000_000);
        s.set_playhead(1_000_000);

        assert!(s.trim_to_playhead(TrimSide::Right, true).unwrap());
        assert_eq!(range_of(&s, "a"), TimeRange::new(0, 1_000_000));
        assert_eq!(range_of(&s, "b").start_us, 1_000_000);
        assert_eq!(s.history().undo_count(), 3, "two adds plus one trim");
    }

    #[test]
    fn trim_without_ripple_leaves_neighbours() {
        let mut s = session();
        place(&mut s, V, "a", 0, 3_000_000);
        place(&mut s, V, "b", 3_000_000, 1_000_000);
        s.set_playhead(2_000_000);

        assert!(s.trim_to_playhead(TrimSide::Left, false).unwrap());
        assert_eq!(range_of(&s, "a"), TimeRange::new(2_000_000, 1_000_000));
        assert_eq!(range_of(&s, "b").start_us, 3_000_000);
        assert_eq!(s.playhead_us(), 2_000_000);
    }

    #[test]
    fn ripple_trim_shifts_items_within_epsilon_of_the_cut_end() {
        let epsilon = EditorConfig::default().ripple_epsilon_us;

        let mut s = session_allowing_overlaps();
        place(&mut s, V, "a", 0, 3_000_000);
        place(&mut s, V, "b", 3_000_000 - epsilon, 1_000_000);
        s.set_playhead(1_000_000);
        assert!(s.trim_to_playhead(TrimSide::Right, true).unwrap());
        assert_eq!(range_of(&s, "b").start_us, 1_000_000 - epsilon);

        let mut s = session_allowing_overlaps();
        place(&mut s, V, "a", 0, 3_000_000);
        place(&mut s, V, "b", 3_000_000 - epsilon - 1, 1_000_000);
        s.set_playhead(1_000_000);
        assert!(s.trim_to_playhead(TrimSide::Right, true).unwrap());
        assert_eq!(range_of(&s, "b").start_us, 3_000_000 - epsilon - 1);
    }

    #[test]
    fn ripple_delete_keeps_items_within_epsilon_of_the_range_end_whole() {
        let epsilon = EditorConfig::default().ripple_epsilon_us;

        // Starts just inside the range: not cut, shifted to the range start.
        let mut s = session_allowing_overlaps();
        place(&mut s, V, "a", 0, 2_000_000);
        place(&mut s, V, "b", 2_000_000 - epsilon, 1_000_000);
        assert!(s.ripple_delete_range(1_000_000, 2_000_000, Some(vec![V.into()])).unwrap());
        assert_eq!(range_of(&s, "b"), TimeRange::new(1_000_000, 1_000_000));

        // One microsecond further in: cut at the range end, head deleted.
        let mut s = session_allowing_overlaps();
        place(&mut s, V, "a", 0, 2_000_000);
        place(&mut s, V, "b", 2_000_000 - epsilon - 1, 1_000_000);
        assert!(s.ripple_delete_range(1_000_000, 2_000_000, Some(vec![V.into()])).unwrap());
        assert!(find_clip(s.document(), "b").is_none());
        let tail = s.document().tracks[0]
            .items
            .iter()
            .map(Item::timeline_range)
            .find(|r| r.start_us == 1_000_000)
            .unwrap();
        assert_eq!(tail.duration_us, 1_000_000 - epsilon - 1);
    }

    #[test]
    fn trim_outside_any_clip_does_nothing() {
        let mut s = session();
        place(&mut s, V, "a", 0, 1_000_000);
        s.set_playhead(5_000_000);
        assert!(!s.trim_to_playhead(TrimSide::Left, true).unwrap());
    }

    #[test]
    fn ripple_delete_splits_deletes_and_shifts() {
        let mut s = session();
        place(&mut s, V, "a", 0, 2_000_000);
        place(&mut s, V, "b", 2_000_000, 2_000_000);
        place(&mut s, V, "c", 5_000_000, 1_000_000);
        s.set_playhead(5_500_000);

        assert!(s.ripple_delete_range(1_000_000, 3_000_000, Some(vec![V.into()])).unwrap());

        let track = &s.document().tracks[0];
        let mut ranges: Vec<TimeRange> = track.items.iter().map(Item::timeline_range).collect();
        ranges.sort_by_key(|r| r.start_us);
        assert_eq!(
            ranges,
            vec![
                TimeRange::new(0, 1_000_000),
                TimeRange::new(1_000_000, 1_000_000),
                TimeRange::new(3_000_000, 1_000_000),
            ]
        );
        assert_eq!(range_of(&s, "a"), TimeRange::new(0, 1_000_000));
        assert_eq!(range_of(&s, "c").start_us, 3_000_000);
        assert_eq!(s.playhead_us(), 3_500_000);
    }

    #[test]
    fn ripple_delete_rejects_empty_range_and_unknown_track() {
        let mut s = session();
        assert!(matches!(
            s.ripple_delete_range(2, 2, None),
            Err(SessionError::InvalidRange { .. })
        ));
        assert!(matches!(
            s.ripple_delete_range(0, 10, Some(vec!["nope".into()])),
            Err(SessionError::Timeline(TimelineError::TrackNotFound { .. }))
        ));
    }

    #[test]
    fn delete_selection_removes_across_tracks() {
        let mut s = session();
        place(&mut s, V, "v1", 0, 1_000_000);
        place(&mut s, V, "v2", 1_000_000, 1_000_000);
        place(&mut s, A, "a1", 0, 1_000_000);
        s.select_item(V, "v1", true);
        s.select_item(A, "a1", true);

        assert_eq!(s.delete_selection().unwrap(), 2);
        assert!(find_clip(s.document(), "v1").is_none());
        assert!(find_clip(s.document(), "a1").is_none());
        assert!(find_clip(s.document(), "v2").is_some());
        assert!(s.selection().is_empty());
        assert_eq!(s.history().undo_label(), Some("Delete clips"));
    }

    #[test]
    fn jump_between_boundaries() {
        let mut s = session();
        place(&mut s, V, "a", 1_000_000, 1_000_000);
        place(&mut s, A, "b", 4_000_000, 1_000_000);

        assert_eq!(s.jump_to_clip_boundary(JumpDirection::Next, None), 1_000_000);
        assert_eq!(s.jump_to_clip_boundary(JumpDirection::Next, None), 2_000_000);
        assert_eq!(s.jump_to_clip_boundary(JumpDirection::Next, Some(V)), 5_000_000, "no later boundary on V: document end");
        assert_eq!(s.jump_to_clip_boundary(JumpDirection::Previous, None), 4_000_000);
        s.set_playhead(500_000);
        assert_eq!(s.jump_to_clip_boundary(JumpDirection::Previous, None), 0);
    }

    #[test]
    fn add_clip_from_path_uses_metadata() {
        let metadata = MetadataTable::new()
            .with("voice.wav", MediaMetadata::from_seconds(4.0, false, true))
            .with("logo.png", MediaMetadata::new(0, true, false));
        let mut s = session_with(MemoryStorage::new(), metadata);

        let id = s.add_clip_from_path(A, "voice.wav", None).unwrap();
        let (_, clip) = find_clip(s.document(), &id).unwrap();
        assert_eq!(clip.timeline_range, TimeRange::new(0, 4_000_000));
        assert_eq!(clip.source_duration_us, Some(4_000_000));

        let err = s.add_clip_from_path(V, "voice.wav", None).unwrap_err();
        assert!(matches!(err, SessionError::Timeline(TimelineError::IncompatibleSource { .. })));

        let still = s.add_clip_from_path(V, "logo.png", Some(0)).unwrap();
        let (_, clip) = find_clip(s.document(), &still).unwrap();
        assert_eq!(clip.is_image, Some(true));
        assert_eq!(clip.timeline_range.duration_us, STILL_DURATION_US);
        assert!(s.add_clip_from_path(A, "logo.png", None).is_err());

        assert!(matches!(
            s.add_clip_from_path(V, "unknown.mov", None),
            Err(SessionError::MetadataUnavailable { .. })
        ));
    }

    #[test]
    fn nested_timeline_clip_takes_nested_duration() {
        let mut nested = sp_timeline::TimelineDocument::fallback("n", "Nested", 30.0);
        nested.tracks[0].items.push(Item::Clip(Clip::media(
            "x",
            "x",
            "x.mp4",
            TimeRange::new(0, 7_000_000),
            TimeRange::new(0, 7_000_000),
        )));
        let storage = MemoryStorage::new()
            .with_file("timelines/b-roll.otio", sp_project::serialize(&nested).unwrap());
        let mut s = session_with(storage, MetadataTable::new());

        let id = s.add_clip_from_path(V, "timelines/b-roll.otio", Some(0)).unwrap();
        let (_, clip) = find_clip(s.document(), &id).unwrap();
        assert_eq!(clip.clip_type, ClipType::Timeline);
        assert_eq!(clip.timeline_range.duration_us, 7_000_000);
    }

    #[test]
    fn hydrate_is_not_undoable() {
        let metadata = MetadataTable::new().with("m.mp4", MediaMetadata::from_seconds(20.0, true, true));
        let mut s = session_with(MemoryStorage::new(), metadata);
        place(&mut s, V, "a", 0, 1_000_000);
        let undo_before = s.history().undo_count();

        assert!(s.hydrate_clip_source("a").unwrap());
        let (_, clip) = find_clip(s.document(), "a").unwrap();
        assert_eq!(clip.source_duration_us, Some(20_000_000));
        assert_eq!(clip.is_image, Some(false));
        assert_eq!(s.history().undo_count(), undo_before);

        assert!(!s.hydrate_clip_source("a").unwrap(), "second hydrate changes nothing");
        assert!(matches!(
            s.hydrate_clip_source("ghost"),
            Err(SessionError::ItemNotFound { .. })
        ));
    }
}
