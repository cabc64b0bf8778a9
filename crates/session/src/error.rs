//! Error types for the edit session (thiserror-based).

use thiserror::Error;

use sp_project::ProjectError;
use sp_timeline::TimelineError;

/// Errors returned to the caller of a session operation.
///
/// Save failures are not among them: they land in
/// `EditorState::last_save_error` and a `SessionEvent::SaveFailed`.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A command failed validation; the document is unchanged.
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Reading through the storage collaborator failed.
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: String },

    /// The metadata resolver knows nothing about this source.
    #[error("No metadata for source: {path}")]
    MetadataUnavailable { path: String },

    #[error("Invalid range: {start_us}..{end_us}")]
    InvalidRange { start_us: i64, end_us: i64 },
}

/// Convenience Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
