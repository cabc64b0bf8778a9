//! Error types for the project crate (thiserror-based).

use thiserror::Error;

/// Errors that can occur while reading or writing interchange files.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// File I/O error (read, write, rename).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level object is not an OTIO timeline we understand.
    #[error("Unsupported schema: {schema}")]
    UnsupportedSchema { schema: String },

    /// The file parsed but describes an impossible timeline.
    #[error("Invalid timeline: {reason}")]
    InvalidTimeline { reason: String },
}

/// Convenience Result type for project operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ProjectError::UnsupportedSchema {
            schema: "Timeline.9".into(),
        };
        assert!(err.to_string().contains("Timeline.9"));

        let err = ProjectError::InvalidTimeline {
            reason: "negative duration".into(),
        };
        assert!(err.to_string().contains("negative duration"));
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let proj_err: ProjectError = io_err.into();
        assert!(matches!(proj_err, ProjectError::Io(_)));
    }

    #[test]
    fn json_error_conversion() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("not json");
        let json_err = result.unwrap_err();
        let proj_err: ProjectError = json_err.into();
        assert!(matches!(proj_err, ProjectError::Json(_)));
    }
}
