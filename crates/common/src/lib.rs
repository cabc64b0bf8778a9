//! `sp-common` — Shared time utilities, ids, and configuration for the Splice editor core.
//!
//! - **Time**: microsecond/frame conversion and frame quantization
//! - **Ids**: prefixed uuid identifiers
//! - **Config**: `EditorConfig` (history depth, debounce windows, ripple tolerance)

pub mod config;
pub mod ids;
pub mod time;

pub use config::{EditorConfig, OverlapPolicy};
pub use ids::new_id;
pub use time::{
    frame_duration_us, frame_to_us, quantize_time_us_to_frames, seconds_to_us, us_to_frame,
    us_to_seconds, QuantizeMode, US_PER_SECOND,
};
