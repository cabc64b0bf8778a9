//! `sp-project` — Timeline interchange for the Splice editor core.
//!
//! Documents are stored as OpenTimelineIO JSON. Fields OTIO has no slot
//! for live under the `"splice"` key of each object's `metadata`, so files
//! stay readable by other OTIO tools and round-trip losslessly here.
//!
//! - **Save**: `TimelineDocument` to `Timeline.1` JSON, with filler gaps
//!   padding the holes between items
//! - **Load**: OTIO JSON to `TimelineDocument`, tolerant of foreign files
//!   (missing vendor data, `Clip.1` references, unknown children)
//! - **Fallback**: unreadable text yields an empty two-track document
//!
//! # Usage
//!
//! ```rust,no_run
//! use sp_project::{load_timeline_file, save_timeline_file, DocumentDefaults};
//! use sp_timeline::TimelineDocument;
//! use std::path::Path;
//!
//! let doc = TimelineDocument::fallback("doc_1", "Main", 30.0);
//! save_timeline_file(&doc, Path::new("main.otio")).unwrap();
//!
//! let defaults = DocumentDefaults::new("doc_1", "Main", 30.0);
//! let loaded = load_timeline_file(Path::new("main.otio"), &defaults).unwrap();
//! assert_eq!(loaded, doc);
//! ```

pub mod error;
pub mod load;
pub mod save;
pub mod types;

// Re-export primary API at crate root
pub use error::{ProjectError, ProjectResult};
pub use load::{fallback_document, from_otio, load_timeline_file, parse, try_parse};
pub use save::{save_timeline_file, serialize, serialize_compact, to_otio, write_atomic};
pub use types::{DocumentDefaults, OtioTimeline, VENDOR_KEY};
