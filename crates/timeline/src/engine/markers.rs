use sp_common::new_id;

use crate::error::{TimelineError, TimelineResult};
use crate::types::{Marker, TimelineDocument};

/// Keep markers ordered by time; markers at the same time keep insertion order.
fn sort_markers(markers: &mut [Marker]) {
    markers.sort_by_key(|m| m.time_us);
}

pub(super) fn add_marker(
    doc: &mut TimelineDocument,
    marker_id: Option<String>,
    time_us: i64,
    text: String,
) -> TimelineResult<bool> {
    let markers = &mut doc.metadata.markers;
    let id = match marker_id {
        Some(id) if markers.iter().any(|m| m.id == id) => {
            return Err(TimelineError::DuplicateId { id });
        }
        Some(id) => id,
        None => new_id("marker"),
    };
    markers.push(Marker {
        id,
        time_us: time_us.max(0),
        text,
    });
    sort_markers(markers);
    Ok(true)
}

pub(super) fn update_marker(
    doc: &mut TimelineDocument,
    marker_id: &str,
    time_us: Option<i64>,
    text: Option<String>,
) -> bool {
    let markers = &mut doc.metadata.markers;
    let Some(marker) = markers.iter_mut().find(|m| m.id == marker_id) else {
        return false;
    };
    let before = marker.clone();
    if let Some(t) = time_us {
        marker.time_us = t.max(0);
    }
    if let Some(text) = text {
        marker.text = text;
    }
    if *marker == before {
        return false;
    }
    sort_markers(markers);
    true
}

pub(super) fn remove_marker(doc: &mut TimelineDocument, marker_id: &str) -> bool {
    let markers = &mut doc.metadata.markers;
    let before = markers.len();
    markers.retain(|m| m.id != marker_id);
    markers.len() != before
}
