//! End-to-end scenarios for the edit session: edits, history, debounced
//! persistence, loads and save failures.

use std::sync::Arc;

use sp_app_state::ManualClock;
use sp_project::DocumentDefaults;
use sp_session::{
    ApplyMode, EditSession, FsStorage, MediaMetadata, MetadataTable, MemoryStorage, SessionError,
    SessionEvent, SessionOptions, Storage, TrimSide,
};
use sp_timeline::{
    find_clip, ClipType, TimeRange, TimelineCommand, TimelineDocument, TimelineError, TrimEdge,
};

const V: &str = "track_video_1";
const A: &str = "track_audio_1";
const PATH: &str = "timeline.otio";

fn options() -> SessionOptions {
    SessionOptions::new(PATH, DocumentDefaults::new("doc", "Main", 30.0))
}

fn session_on(storage: Arc<dyn Storage>, clock: &ManualClock) -> EditSession {
    EditSession::new(
        storage,
        Arc::new(MetadataTable::new()),
        Arc::new(clock.clone()),
        options(),
    )
}

fn session_with_metadata(metadata: Arc<MetadataTable>, clock: &ManualClock) -> EditSession {
    EditSession::new(
        Arc::new(MemoryStorage::new()),
        metadata,
        Arc::new(clock.clone()),
        options(),
    )
}

/// An add as a caller without metadata would issue it.
fn add_unresolved(track_id: &str, id: &str, path: &str, start_us: i64, duration_us: i64) -> TimelineCommand {
    TimelineCommand::AddClipToTrack {
        track_id: track_id.into(),
        item_id: Some(id.into()),
        clip_type: ClipType::Media,
        name: None,
        path: path.into(),
        start_us: Some(start_us),
        duration_us,
        source_start_us: 0,
        source_duration_us: None,
        source_info: None,
    }
}

fn add(id: &str, start_us: i64, duration_us: i64) -> TimelineCommand {
    TimelineCommand::AddClipToTrack {
        track_id: V.into(),
        item_id: Some(id.into()),
        clip_type: ClipType::Media,
        name: None,
        path: "media/a.mp4".into(),
        start_us: Some(start_us),
        duration_us,
        source_start_us: 0,
        source_duration_us: Some(30_000_000),
        source_info: None,
    }
}

fn move_to(id: &str, start_us: i64) -> TimelineCommand {
    TimelineCommand::MoveItem {
        track_id: V.into(),
        item_id: id.into(),
        start_us,
    }
}

fn start_of(session: &EditSession, id: &str) -> Option<i64> {
    find_clip(session.document(), id).map(|(_, c)| c.timeline_range.start_us)
}

#[test]
fn ripple_trim_left_pulls_following_clip_back() {
    let clock = ManualClock::new();
    let mut session = session_on(Arc::new(MemoryStorage::new()), &clock);
    session.apply_timeline(add("a", 0, 3_000_000), ApplyMode::default()).unwrap();
    session.apply_timeline(add("b", 3_000_000, 1_000_000), ApplyMode::default()).unwrap();
    session.set_playhead(1_000_000);

    assert!(session.trim_to_playhead(TrimSide::Left, true).unwrap());

    let (_, a) = find_clip(session.document(), "a").unwrap();
    assert_eq!(a.timeline_range.duration_us, 2_000_000);
    assert_eq!(a.timeline_range.start_us, 0);
    assert_eq!(a.source_range.unwrap().start_us, 1_000_000);
    assert_eq!(start_of(&session, "b"), Some(2_000_000));
    assert_eq!(session.playhead_us(), 0);

    // One undo step restores both clips.
    assert!(session.undo());
    assert_eq!(start_of(&session, "a"), Some(0));
    assert_eq!(start_of(&session, "b"), Some(3_000_000));
}

#[test]
fn undo_redo_are_symmetric() {
    let clock = ManualClock::new();
    let mut session = session_on(Arc::new(MemoryStorage::new()), &clock);
    session.apply_timeline(add("a", 0, 1_000_000), ApplyMode::default()).unwrap();

    let d0 = Arc::clone(session.document());
    session.apply_timeline(move_to("a", 5_000_000), ApplyMode::default()).unwrap();
    let d1 = Arc::clone(session.document());

    assert!(session.undo());
    assert!(Arc::ptr_eq(session.document(), &d0));
    assert!(session.redo());
    assert!(Arc::ptr_eq(session.document(), &d1));
    assert_eq!(**session.document(), *d1);
    assert!(!session.can_redo());
}

#[test]
fn failed_command_changes_nothing() {
    let clock = ManualClock::new();
    let mut session = session_on(Arc::new(MemoryStorage::new()), &clock);
    session.apply_timeline(add("a", 0, 1_000_000), ApplyMode::default()).unwrap();
    session.apply_timeline(add("b", 2_000_000, 1_000_000), ApplyMode::default()).unwrap();

    let before = Arc::clone(session.document());
    let revision = session.state().dirty_revision;
    let err = session
        .apply_timeline(move_to("b", 500_000), ApplyMode::default())
        .unwrap_err();

    assert!(matches!(err, SessionError::Timeline(TimelineError::Overlap { .. })));
    assert!(Arc::ptr_eq(session.document(), &before));
    assert_eq!(session.state().dirty_revision, revision);
    assert_eq!(session.history().undo_count(), 2);
}

#[test]
fn continuous_edits_coalesce_into_one_step_and_one_write() {
    let clock = ManualClock::new();
    let storage = Arc::new(MemoryStorage::new());
    let mut session = session_on(storage.clone(), &clock);
    session.apply_timeline(add("a", 0, 1_000_000), ApplyMode::default()).unwrap();

    for step in 1..=3 {
        clock.advance_ms(100);
        session
            .apply_timeline(move_to("a", step * 100_000), ApplyMode::continuous())
            .unwrap();
        session.tick();
    }
    assert!(session.history().has_pending());
    assert!(session.can_undo());
    assert!(storage.contents(PATH).is_none(), "save still debounced");

    // History quiet period (300 ms) elapses before the save one (500 ms).
    clock.advance_ms(350);
    session.tick();
    assert!(!session.history().has_pending());
    assert_eq!(session.history().undo_count(), 2);
    assert!(storage.contents(PATH).is_none());

    clock.advance_ms(200);
    session.tick();
    let saved = storage.contents(PATH).expect("written after quiet period");
    assert!(!session.state().is_dirty());
    let reread = sp_project::try_parse(&saved, &DocumentDefaults::new("x", "x", 30.0)).unwrap();
    assert_eq!(reread.tracks, session.document().tracks);

    // The whole drag undoes as one step.
    assert!(session.undo());
    assert_eq!(start_of(&session, "a"), Some(0));
    assert!(session.undo());
    assert_eq!(start_of(&session, "a"), None);
}

#[test]
fn immediate_edit_closes_a_pending_burst() {
    let clock = ManualClock::new();
    let mut session = session_on(Arc::new(MemoryStorage::new()), &clock);
    session.apply_timeline(add("a", 0, 1_000_000), ApplyMode::default()).unwrap();
    session
        .apply_timeline(move_to("a", 100_000), ApplyMode::continuous())
        .unwrap();
    session.apply_timeline(add("b", 5_000_000, 1_000_000), ApplyMode::default()).unwrap();

    assert_eq!(session.history().undo_count(), 3);
    assert!(session.undo());
    assert_eq!(start_of(&session, "b"), None);
    assert_eq!(start_of(&session, "a"), Some(100_000));
}

#[test]
fn stale_load_is_discarded() {
    let clock = ManualClock::new();
    let newer = TimelineDocument::fallback("newer", "Newer", 25.0);
    let older = TimelineDocument::fallback("older", "Older", 25.0);
    let mut session = session_on(Arc::new(MemoryStorage::new()), &clock);

    let first = session.begin_load();
    let second = session.begin_load();
    assert!(session.finish_load(second, Some(&sp_project::serialize(&newer).unwrap())));
    assert!(!session.finish_load(first, Some(&sp_project::serialize(&older).unwrap())));
    assert_eq!(session.document().id, "newer");
}

#[test]
fn load_resets_history_and_restores_playhead() {
    let clock = ManualClock::new();
    let mut doc = TimelineDocument::fallback("saved", "Saved", 30.0);
    doc.metadata.playhead_us = Some(99_000_000);
    let storage = Arc::new(MemoryStorage::new().with_file(PATH, sp_project::serialize(&doc).unwrap()));
    let mut session = session_on(storage.clone(), &clock);
    session.apply_timeline(add("a", 0, 3_000_000), ApplyMode::default()).unwrap();
    session.set_playhead(2_000_000);
    session.save_now();

    let mut reopened = session_on(storage, &clock);
    assert!(reopened.load().unwrap());
    assert_eq!(reopened.document().tracks, session.document().tracks);
    assert_eq!(reopened.playhead_us(), 2_000_000);
    assert!(!reopened.can_undo());
    assert!(!reopened.state().is_dirty());
}

#[test]
fn playhead_past_the_end_is_clamped_on_load() {
    let clock = ManualClock::new();
    let mut doc = TimelineDocument::fallback("saved", "Saved", 30.0);
    doc.metadata.playhead_us = Some(99_000_000);
    let storage = Arc::new(MemoryStorage::new().with_file(PATH, sp_project::serialize(&doc).unwrap()));
    let mut session = session_on(storage, &clock);

    session.load().unwrap();
    assert_eq!(session.document().id, "saved");
    assert_eq!(session.playhead_us(), 0, "empty document has zero duration");
}

#[test]
fn unreadable_file_loads_fallback_document() {
    let clock = ManualClock::new();
    let storage = Arc::new(MemoryStorage::new().with_file(PATH, "{ this is not otio"));
    let mut session = session_on(storage, &clock);

    assert!(session.load().unwrap());
    assert_eq!(session.document().id, "doc");
    assert_eq!(session.document().tracks.len(), 2);
}

#[test]
fn save_failures_are_recorded_not_returned() {
    let clock = ManualClock::new();
    let storage = Arc::new(MemoryStorage::new());
    let mut session = session_on(storage.clone(), &clock);
    let events = session.subscribe();

    storage.fail_writes(Some("disk full"));
    let changed = session
        .apply_timeline(add("a", 0, 1_000_000), ApplyMode::immediate())
        .unwrap();
    assert!(changed);
    assert!(session.state().last_save_error.as_deref().unwrap().contains("disk full"));
    assert!(session.state().is_dirty());
    assert!(session.can_undo(), "history unaffected by the failed save");

    let received: Vec<SessionEvent> = events.try_iter().collect();
    assert!(received
        .iter()
        .any(|e| matches!(e, SessionEvent::SaveFailed { error, .. } if error.contains("disk full"))));
    assert!(received
        .iter()
        .any(|e| matches!(e, SessionEvent::DocumentChanged { command_type: Some(t), .. } if t == "add_clip_to_track")));

    storage.fail_writes(None);
    assert!(session.save_now());
    assert!(session.state().last_save_error.is_none());
    assert!(!session.state().is_dirty());
    assert!(storage.contents(PATH).is_some());
}

#[test]
fn filesystem_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let storage: Arc<dyn Storage> = Arc::new(FsStorage::new(dir.path()));

    let mut session = session_on(Arc::clone(&storage), &clock);
    session.apply_timeline(add("a", 0, 2_000_000), ApplyMode::default()).unwrap();
    session.flush();
    assert!(dir.path().join(PATH).is_file());
    assert!(!session.has_pending_save());

    let mut reopened = session_on(storage, &clock);
    reopened.load().unwrap();
    assert_eq!(reopened.document().tracks, session.document().tracks);
}

#[test]
fn raw_add_is_checked_against_resolved_metadata() {
    let clock = ManualClock::new();
    let metadata = Arc::new(
        MetadataTable::new()
            .with("m.mp4", MediaMetadata::from_seconds(2.0, true, true))
            .with("music.wav", MediaMetadata::from_seconds(60.0, false, true)),
    );
    let mut session = session_with_metadata(metadata, &clock);

    session
        .apply_timeline(add_unresolved(V, "m", "m.mp4", 0, 1_000_000), ApplyMode::default())
        .unwrap();
    let (_, clip) = find_clip(session.document(), "m").unwrap();
    assert_eq!(clip.source_duration_us, Some(2_000_000));
    assert_eq!(clip.is_image, Some(false));

    let err = session
        .apply_timeline(add_unresolved(V, "w", "music.wav", 5_000_000, 1_000_000), ApplyMode::default())
        .unwrap_err();
    assert!(matches!(err, SessionError::Timeline(TimelineError::IncompatibleSource { .. })));
    assert!(find_clip(session.document(), "w").is_none());
}

#[test]
fn raw_move_to_audio_track_needs_an_audio_stream() {
    let clock = ManualClock::new();
    let metadata = Arc::new(MetadataTable::new().with("silent.mp4", MediaMetadata::from_seconds(4.0, true, false)));
    let mut session = session_with_metadata(metadata, &clock);
    let clip_id = session.add_clip_from_path(V, "silent.mp4", Some(0)).unwrap();

    let err = session
        .apply_timeline(
            TimelineCommand::MoveItemToTrack {
                from_track_id: V.into(),
                to_track_id: A.into(),
                item_id: clip_id.clone(),
                start_us: 0,
                source_info: None,
            },
            ApplyMode::default(),
        )
        .unwrap_err();

    assert!(matches!(err, SessionError::Timeline(TimelineError::IncompatibleSource { .. })));
    assert!(session.document().tracks[1].items.is_empty());
    assert_eq!(session.document().tracks[0].items.len(), 1);
}

#[test]
fn raw_extract_audio_needs_an_audio_stream() {
    let clock = ManualClock::new();
    let metadata = Arc::new(
        MetadataTable::new()
            .with("silent.mp4", MediaMetadata::from_seconds(4.0, true, false))
            .with("talk.mp4", MediaMetadata::from_seconds(4.0, true, true)),
    );
    let mut session = session_with_metadata(metadata, &clock);
    let silent = session.add_clip_from_path(V, "silent.mp4", Some(0)).unwrap();
    let talk = session.add_clip_from_path(V, "talk.mp4", Some(5_000_000)).unwrap();

    let extract = |item_id: &str| TimelineCommand::ExtractAudioToTrack {
        video_track_id: V.into(),
        item_id: item_id.into(),
        audio_track_id: None,
        new_item_id: None,
        source_info: None,
    };

    let err = session.apply_timeline(extract(&silent), ApplyMode::default()).unwrap_err();
    assert!(matches!(err, SessionError::Timeline(TimelineError::NoAudioInSource { .. })));
    assert!(session.document().tracks[1].items.is_empty());

    assert!(session.apply_timeline(extract(&talk), ApplyMode::default()).unwrap());
    assert_eq!(session.document().tracks[1].items.len(), 1);
}

#[test]
fn raw_trim_is_clamped_to_the_hydrated_source_length() {
    let clock = ManualClock::new();
    let metadata = Arc::new(MetadataTable::new());
    let mut session = session_with_metadata(Arc::clone(&metadata), &clock);
    session
        .apply_timeline(add_unresolved(V, "m", "m.mp4", 0, 1_000_000), ApplyMode::default())
        .unwrap();
    assert_eq!(find_clip(session.document(), "m").unwrap().1.source_duration_us, None);

    // The resolver learns the length only after the clip is placed.
    metadata.insert("m.mp4", MediaMetadata::from_seconds(2.0, true, true));
    let changed = session
        .apply_timeline(
            TimelineCommand::TrimItem {
                track_id: V.into(),
                item_id: "m".into(),
                edge: TrimEdge::End,
                delta_us: 10_000_000,
            },
            ApplyMode::default(),
        )
        .unwrap();

    assert!(changed);
    let (_, clip) = find_clip(session.document(), "m").unwrap();
    assert_eq!(clip.timeline_range, TimeRange::new(0, 2_000_000));
    assert_eq!(clip.source_range, Some(TimeRange::new(0, 2_000_000)));
    assert_eq!(session.history().undo_count(), 2, "hydration is not an undo step");

    assert!(session.undo());
    let (_, clip) = find_clip(session.document(), "m").unwrap();
    assert_eq!(clip.timeline_range.duration_us, 1_000_000);
    assert_eq!(clip.source_duration_us, Some(2_000_000));
}
