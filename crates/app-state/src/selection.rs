//! Item and track selection state management.

use serde::{Deserialize, Serialize};
use sp_timeline::TimelineDocument;

/// A selected item, addressed by the track that holds it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub track_id: String,
    pub item_id: String,
}

impl ItemRef {
    pub fn new(track_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            item_id: item_id.into(),
        }
    }
}

/// Tracks which items and tracks are currently selected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    selected_items: Vec<ItemRef>,
    selected_tracks: Vec<String>,
}

impl SelectionState {
    /// Create a new empty selection state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an item. If `multi` is false, clears the previous item selection first.
    pub fn select_item(&mut self, track_id: &str, item_id: &str, multi: bool) {
        if !multi {
            self.selected_items.clear();
        }
        let entry = ItemRef::new(track_id, item_id);
        if !self.selected_items.contains(&entry) {
            self.selected_items.push(entry);
        }
    }

    /// Flip an item's selection (shift-click).
    pub fn toggle_item(&mut self, track_id: &str, item_id: &str) {
        if self.is_item_selected(track_id, item_id) {
            self.deselect_item(track_id, item_id);
        } else {
            self.select_item(track_id, item_id, true);
        }
    }

    pub fn deselect_item(&mut self, track_id: &str, item_id: &str) {
        self.selected_items
            .retain(|r| !(r.track_id == track_id && r.item_id == item_id));
    }

    /// Select a track. If `multi` is false, clears the previous track selection first.
    pub fn select_track(&mut self, track_id: &str, multi: bool) {
        if !multi {
            self.selected_tracks.clear();
        }
        if !self.selected_tracks.iter().any(|id| id == track_id) {
            self.selected_tracks.push(track_id.to_string());
        }
    }

    pub fn deselect_track(&mut self, track_id: &str) {
        self.selected_tracks.retain(|id| id != track_id);
    }

    /// Clear all selections.
    pub fn clear(&mut self) {
        self.selected_items.clear();
        self.selected_tracks.clear();
    }

    pub fn selected_items(&self) -> &[ItemRef] {
        &self.selected_items
    }

    pub fn selected_tracks(&self) -> &[String] {
        &self.selected_tracks
    }

    /// Selected item ids on one track.
    pub fn items_on_track<'a>(&'a self, track_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.selected_items
            .iter()
            .filter(move |r| r.track_id == track_id)
            .map(|r| r.item_id.as_str())
    }

    pub fn is_item_selected(&self, track_id: &str, item_id: &str) -> bool {
        self.selected_items
            .iter()
            .any(|r| r.track_id == track_id && r.item_id == item_id)
    }

    pub fn is_track_selected(&self, track_id: &str) -> bool {
        self.selected_tracks.iter().any(|id| id == track_id)
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected_items.is_empty() && self.selected_tracks.is_empty()
    }

    pub fn count(&self) -> usize {
        self.selected_items.len() + self.selected_tracks.len()
    }

    /// Drop references to tracks and items that no longer exist in `doc`,
    /// and follow items that moved to another track.
    /// Returns true if the selection changed.
    pub fn prune(&mut self, doc: &TimelineDocument) -> bool {
        let before = self.clone();

        self.selected_tracks
            .retain(|id| doc.tracks.iter().any(|t| &t.id == id));

        let mut kept: Vec<ItemRef> = Vec::with_capacity(self.selected_items.len());
        for r in self.selected_items.drain(..) {
            let Some(track) = doc
                .tracks
                .iter()
                .find(|t| t.find_item(&r.item_id).is_some())
            else {
                continue;
            };
            let moved = ItemRef::new(track.id.clone(), r.item_id);
            if !kept.contains(&moved) {
                kept.push(moved);
            }
        }
        self.selected_items = kept;

        *self != before
    }
}
