//! Identifier generation for tracks, items, markers, and documents.

use uuid::Uuid;

/// Generate a fresh identifier of the form `{prefix}_{32 hex digits}`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}
