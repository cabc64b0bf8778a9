//! Editor configuration: history depth, debounce windows, ripple tolerance.

use serde::{Deserialize, Serialize};

/// How the command engine treats clips that would overlap on one track.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Commands that would create an overlap fail validation.
    #[default]
    Reject,
    /// Overlaps are permitted (stacked layouts, imported documents).
    Allow,
}

/// Top-level editor configuration.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of undo entries kept.
    pub history_capacity: usize,
    /// Quiet period that closes a debounced history burst.
    pub history_debounce_ms: u64,
    /// Quiet period before a debounced save is written.
    pub save_debounce_ms: u64,
    /// Tolerance for deciding which clips are "subsequent" during ripple edits.
    pub ripple_epsilon_us: i64,
    /// Frame rate for documents created without a file.
    pub default_fps: f64,
    pub overlap_policy: OverlapPolicy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            history_debounce_ms: 300,
            save_debounce_ms: 500,
            ripple_epsilon_us: 10,
            default_fps: 30.0,
            overlap_policy: OverlapPolicy::Reject,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
