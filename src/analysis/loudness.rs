//! Loudness metering: decibel power → display level + sustained-tone flag.
//!
//! | Input (dBFS)        | `normalized_level` | `is_sustained` |
//! |---------------------|--------------------|----------------|
//! | `-160` (silence)    | `0.2` (floor)      | `false`        |
//! | `-45`               | `0.375`            | `false`        |
//! | `-30`               | `0.75`             | `true`         |
//! | `-20`               | `1.0`              | `true`         |
//! | `-2` and louder     | `≥ 1.45`           | `false`        |
//!
//! The sustained band deliberately excludes both near-silence (capture noise)
//! and near-full-scale input (clipping), so neither accrues breath time.

/// Lowest level reported for display.
pub const LEVEL_FLOOR: f32 = 0.2;

/// Power reported for silence or an empty buffer.
pub const SILENCE_DB: f32 = -160.0;

/// Exclusive bounds of the sustained-tone band in dBFS.
const SUSTAIN_MIN_DB: f32 = -45.0;
const SUSTAIN_MAX_DB: f32 = -2.0;

/// One metering sample, classified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessReading {
    /// Display level, never below [`LEVEL_FLOOR`].
    pub level: f32,
    /// `true` when the input is inside the sustained-tone band.
    pub sustained: bool,
}

/// Map a decibel power reading onto a display level.
///
/// `-60 dB → 0.0` and `-20 dB → 1.0` linearly, then floored at
/// [`LEVEL_FLOOR`].  There is no upper clamp.  `NaN` maps to the floor.
pub fn normalized_level(power_db: f32) -> f32 {
    ((power_db + 60.0) / 40.0).max(LEVEL_FLOOR)
}

/// `true` iff `-45 < power_db < -2`.
pub fn is_sustained(power_db: f32) -> bool {
    power_db > SUSTAIN_MIN_DB && power_db < SUSTAIN_MAX_DB
}

pub fn measure(power_db: f32) -> LoudnessReading {
    LoudnessReading {
        level: normalized_level(power_db),
        sustained: is_sustained(power_db),
    }
}

/// RMS power of `samples` in dBFS, floored at [`SILENCE_DB`].
pub fn average_power_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return SILENCE_DB;
    }
    let mean_sq: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = mean_sq.sqrt();
    if rms <= 0.0 || !rms.is_finite() {
        return SILENCE_DB;
    }
    (20.0 * rms.log10()).max(SILENCE_DB)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_never_below_floor_and_monotonic() {
        let mut previous = f32::NEG_INFINITY;
        let mut db = -200.0_f32;
        while db <= 10.0 {
            let level = normalized_level(db);
            assert!(level >= LEVEL_FLOOR, "level({db}) = {level}");
            assert!(level >= previous, "not monotonic at {db}");
            previous = level;
            db += 0.25;
        }
    }

    #[test]
    fn level_anchor_points() {
        assert_eq!(normalized_level(-160.0), LEVEL_FLOOR);
        assert_eq!(normalized_level(-60.0), LEVEL_FLOOR);
        assert!((normalized_level(-20.0) - 1.0).abs() < 1e-6);
        assert!((normalized_level(-40.0) - 0.5).abs() < 1e-6);
        // No upper clamp.
        assert!((normalized_level(0.0) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn nan_level_is_floor() {
        assert_eq!(normalized_level(f32::NAN), LEVEL_FLOOR);
        assert!(!is_sustained(f32::NAN));
    }

    #[test]
    fn sustained_band_is_exclusive() {
        assert!(!is_sustained(-45.0));
        assert!(!is_sustained(-2.0));
        assert!(!is_sustained(-46.0));
        assert!(!is_sustained(-1.0));
        assert!(!is_sustained(-160.0));
        assert!(is_sustained(-44.9));
        assert!(is_sustained(-30.0));
        assert!(is_sustained(-2.1));
    }

    #[test]
    fn measure_combines_both() {
        let reading = measure(-30.0);
        assert!(reading.sustained);
        assert!((reading.level - 0.75).abs() < 1e-6);

        let silent = measure(SILENCE_DB);
        assert!(!silent.sustained);
        assert_eq!(silent.level, LEVEL_FLOOR);
    }

    #[test]
    fn power_of_silence_and_empty() {
        assert_eq!(average_power_db(&[]), SILENCE_DB);
        assert_eq!(average_power_db(&[0.0; 256]), SILENCE_DB);
    }

    #[test]
    fn power_of_full_scale_is_zero_db() {
        let db = average_power_db(&[1.0, -1.0, 1.0, -1.0]);
        assert!(db.abs() < 1e-4, "db = {db}");
    }

    #[test]
    fn power_of_tenth_scale_is_minus_twenty() {
        let db = average_power_db(&[0.1_f32; 512]);
        assert!((db + 20.0).abs() < 1e-3, "db = {db}");
        assert!(is_sustained(db));
    }
}
