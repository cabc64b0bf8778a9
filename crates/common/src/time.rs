//! Frame/microsecond conversions and frame quantization.
//!
//! All timeline positions are integer microseconds. Cut points are snapped to
//! frame boundaries by converting to a frame index first and then back to
//! microseconds, never by rounding the microsecond value itself, so that
//! quantizing an already-quantized value returns it unchanged.

use serde::{Deserialize, Serialize};

/// Microseconds per second.
pub const US_PER_SECOND: i64 = 1_000_000;

/// How a time that falls between two frame boundaries is resolved.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantizeMode {
    /// Nearest frame boundary.
    #[default]
    Round,
    /// Frame boundary at or before the time.
    Floor,
    /// Frame boundary at or after the time.
    Ceil,
}

/// Convert a frame index to microseconds at the given frame rate.
pub fn frame_to_us(frame: i64, fps: f64) -> i64 {
    if !(fps > 0.0) {
        return 0;
    }
    (frame as f64 * US_PER_SECOND as f64 / fps).round() as i64
}

/// Convert microseconds to a frame index at the given frame rate.
///
/// A time that sits exactly on a frame boundary (as produced by
/// [`frame_to_us`]) maps back to that frame in every mode, even when the
/// boundary itself was rounded to a whole microsecond.
pub fn us_to_frame(us: i64, fps: f64, mode: QuantizeMode) -> i64 {
    if !(fps > 0.0) {
        return 0;
    }
    let exact = us as f64 * fps / US_PER_SECOND as f64;
    let nearest = exact.round() as i64;
    if frame_to_us(nearest, fps) == us {
        return nearest;
    }
    match mode {
        QuantizeMode::Round => nearest,
        QuantizeMode::Floor => exact.floor() as i64,
        QuantizeMode::Ceil => exact.ceil() as i64,
    }
}

/// Snap a time to a frame boundary.
pub fn quantize_time_us_to_frames(us: i64, fps: f64, mode: QuantizeMode) -> i64 {
    frame_to_us(us_to_frame(us, fps, mode), fps)
}

/// Length of one frame in microseconds (never less than 1).
pub fn frame_duration_us(fps: f64) -> i64 {
    frame_to_us(1, fps).max(1)
}

pub fn seconds_to_us(secs: f64) -> i64 {
    (secs * US_PER_SECOND as f64).round() as i64
}

pub fn us_to_seconds(us: i64) -> f64 {
    us as f64 / US_PER_SECOND as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATES: [f64; 6] = [23.976, 24.0, 25.0, 29.97, 30.0, 60.0];
    const MODES: [QuantizeMode; 3] = [QuantizeMode::Round, QuantizeMode::Floor, QuantizeMode::Ceil];

    #[test]
    fn frame_to_us_at_common_rates() {
        assert_eq!(frame_to_us(1, 25.0), 40_000);
        assert_eq!(frame_to_us(30, 30.0), 1_000_000);
        assert_eq!(frame_to_us(1, 30.0), 33_333);
        assert_eq!(frame_to_us(2, 30.0), 66_667);
    }

    #[test]
    fn us_to_frame_modes() {
        assert_eq!(us_to_frame(50_000, 25.0, QuantizeMode::Round), 1);
        assert_eq!(us_to_frame(50_000, 25.0, QuantizeMode::Floor), 1);
        assert_eq!(us_to_frame(50_000, 25.0, QuantizeMode::Ceil), 2);
        assert_eq!(us_to_frame(70_000, 25.0, QuantizeMode::Round), 2);
    }

    #[test]
    fn rounded_boundary_maps_back_to_its_frame() {
        // 33_333 µs is frame 1 at 30 fps even though 33_333 * 30 / 1e6 < 1.
        assert_eq!(us_to_frame(33_333, 30.0, QuantizeMode::Floor), 1);
        assert_eq!(us_to_frame(66_667, 30.0, QuantizeMode::Ceil), 2);
    }

    #[test]
    fn quantize_is_idempotent() {
        for fps in RATES {
            for mode in MODES {
                for us in (0..5_000_000_i64).step_by(7_919) {
                    let once = quantize_time_us_to_frames(us, fps, mode);
                    let twice = quantize_time_us_to_frames(once, fps, mode);
                    assert_eq!(once, twice, "us={us} fps={fps} mode={mode:?}");
                }
            }
        }
    }

    #[test]
    fn floor_and_ceil_bracket_the_input() {
        for fps in RATES {
            for us in (1..2_000_000_i64).step_by(12_345) {
                let lo = quantize_time_us_to_frames(us, fps, QuantizeMode::Floor);
                let hi = quantize_time_us_to_frames(us, fps, QuantizeMode::Ceil);
                assert!(lo <= us && us <= hi, "us={us} fps={fps} lo={lo} hi={hi}");
            }
        }
    }

    #[test]
    fn invalid_fps_degrades_to_zero() {
        assert_eq!(frame_to_us(10, 0.0), 0);
        assert_eq!(us_to_frame(1_000_000, -1.0, QuantizeMode::Round), 0);
        assert_eq!(frame_duration_us(0.0), 1);
    }

    #[test]
    fn seconds_conversion() {
        assert_eq!(seconds_to_us(1.5), 1_500_000);
        assert!((us_to_seconds(250_000) - 0.25).abs() < f64::EPSILON);
    }
}
