//! Zero-crossing pitch estimation and note naming.
//!
//! The estimator counts sign changes across a window and converts the
//! crossing rate into cycles per second:
//!
//! ```text
//! frequency = crossings × sample_rate / (2 × window_len)
//! ```
//!
//! It is cheap (one pass, no allocation) and only meaningful for
//! near-monophonic, near-sinusoidal input such as a sung vowel.  Readings
//! outside the vocal range (80–1200 Hz by default) are reported as
//! "no pitch" rather than mapped to a note.
//!
//! # Example
//!
//! ```rust
//! use vocal_trainer::analysis::{estimate_pitch, note_for};
//!
//! let rate = 44_100;
//! let tone: Vec<f32> = (0..4_410)
//!     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / rate as f32).sin())
//!     .collect();
//!
//! let reading = estimate_pitch(&tone, rate);
//! assert_eq!(reading.label(), "A4");
//! assert_eq!(note_for(261.63).unwrap().to_string(), "C4");
//! assert!(note_for(0.0).is_none());
//! ```

use std::fmt;

/// Label published while no reliable pitch is detected.
pub const NO_PITCH_LABEL: &str = "-";

/// Reference pitch A4 in Hz.
const A4_HZ: f32 = 440.0;
/// MIDI note number of A4.
const A4_MIDI: i32 = 69;

// ---------------------------------------------------------------------------
// PitchClass
// ---------------------------------------------------------------------------

/// One of the twelve equal-tempered pitch classes, starting at C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class for a MIDI note number.  Negative numbers wrap upward.
    pub fn from_midi(midi: i32) -> Self {
        Self::ALL[midi.rem_euclid(12) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

// ---------------------------------------------------------------------------
// Note
// ---------------------------------------------------------------------------

/// A named note in scientific pitch notation (MIDI 69 → `A4`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// Nearest semitone as a MIDI note number.
    pub midi: i32,
    pub pitch_class: PitchClass,
    pub octave: i32,
    /// Signed distance of the measured frequency from the note, in cents
    /// (`-50.0..=50.0`).
    pub cents: f32,
}

impl Note {
    fn from_frequency(frequency_hz: f32) -> Self {
        let exact = 12.0 * (frequency_hz / A4_HZ).log2() + A4_MIDI as f32;
        let midi = exact.round() as i32;
        Self {
            midi,
            pitch_class: PitchClass::from_midi(midi),
            octave: midi.div_euclid(12) - 1,
            cents: (exact - midi as f32) * 100.0,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class.name(), self.octave)
    }
}

// ---------------------------------------------------------------------------
// PitchReading
// ---------------------------------------------------------------------------

/// Result of analysing one buffer.
///
/// `note == None` is the "no pitch detected" sentinel; its frequency is
/// always `0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchReading {
    pub frequency_hz: f32,
    pub note: Option<Note>,
}

impl PitchReading {
    pub const NONE: PitchReading = PitchReading {
        frequency_hz: 0.0,
        note: None,
    };

    /// Note label such as `"A4"`, or [`NO_PITCH_LABEL`].
    pub fn label(&self) -> String {
        match &self.note {
            Some(note) => note.to_string(),
            None => NO_PITCH_LABEL.to_string(),
        }
    }

    pub fn is_detected(&self) -> bool {
        self.note.is_some()
    }
}

impl Default for PitchReading {
    fn default() -> Self {
        Self::NONE
    }
}

// ---------------------------------------------------------------------------
// PitchEstimator
// ---------------------------------------------------------------------------

/// Zero-crossing estimator with a configurable accepted frequency range.
///
/// The `Default` range (80–1200 Hz, both inclusive) covers an adult vocal
/// fundamental plus its first few harmonics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimator {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl Default for PitchEstimator {
    fn default() -> Self {
        Self {
            min_hz: 80.0,
            max_hz: 1200.0,
        }
    }
}

impl PitchEstimator {
    pub fn new(min_hz: f32, max_hz: f32) -> Self {
        Self { min_hz, max_hz }
    }

    /// Raw crossing-rate frequency of `buffer` in Hz, with no range check.
    ///
    /// Returns `0.0` for an empty buffer or a zero sample rate.
    pub fn raw_frequency(&self, buffer: &[f32], sample_rate: u32) -> f32 {
        if buffer.is_empty() || sample_rate == 0 {
            return 0.0;
        }
        let crossings = count_zero_crossings(buffer);
        crossings as f32 * sample_rate as f32 / (2.0 * buffer.len() as f32)
    }

    /// Estimate the pitch of `buffer`, falling back to [`PitchReading::NONE`]
    /// when the crossing rate is outside the accepted range.
    pub fn estimate(&self, buffer: &[f32], sample_rate: u32) -> PitchReading {
        let frequency_hz = self.raw_frequency(buffer, sample_rate);
        match self.note_for(frequency_hz) {
            Some(note) => PitchReading {
                frequency_hz,
                note: Some(note),
            },
            None => PitchReading::NONE,
        }
    }

    /// Map a frequency onto the nearest equal-tempered note.
    ///
    /// Returns `None` outside `min_hz..=max_hz` (including `0.0`, negative
    /// and non-finite input).
    pub fn note_for(&self, frequency_hz: f32) -> Option<Note> {
        if !frequency_hz.is_finite() || frequency_hz < self.min_hz || frequency_hz > self.max_hz {
            return None;
        }
        Some(Note::from_frequency(frequency_hz))
    }
}

/// Number of sign changes between consecutive samples.
///
/// Zero counts as non-negative, so a signal touching zero and returning to
/// the same side does not register a crossing.
pub fn count_zero_crossings(buffer: &[f32]) -> usize {
    buffer
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count()
}

/// [`PitchEstimator::estimate`] with the default vocal range.
pub fn estimate_pitch(buffer: &[f32], sample_rate: u32) -> PitchReading {
    PitchEstimator::default().estimate(buffer, sample_rate)
}

/// [`PitchEstimator::note_for`] with the default vocal range.
pub fn note_for(frequency_hz: f32) -> Option<Note> {
    PitchEstimator::default().note_for(frequency_hz)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn a440_is_a4() {
        let note = note_for(440.0).expect("in range");
        assert_eq!(note.to_string(), "A4");
        assert_eq!(note.midi, 69);
        assert!(note.cents.abs() < 0.01);
    }

    #[test]
    fn middle_c_is_c4() {
        let note = note_for(261.63).expect("in range");
        assert_eq!(note.to_string(), "C4");
        assert_eq!(note.pitch_class, PitchClass::C);
    }

    #[test]
    fn zero_hz_has_no_note() {
        assert!(note_for(0.0).is_none());
        assert!(note_for(f32::NAN).is_none());
        assert!(note_for(-440.0).is_none());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert!(note_for(80.0).is_some());
        assert!(note_for(1200.0).is_some());
        assert!(note_for(79.9).is_none());
        assert!(note_for(1200.1).is_none());
    }

    #[test]
    fn sharps_and_octave_boundaries() {
        // B3 → C4 crosses the octave number at C.
        assert_eq!(note_for(246.94).unwrap().to_string(), "B3");
        assert_eq!(note_for(277.18).unwrap().to_string(), "C#4");
        assert_eq!(note_for(110.0).unwrap().to_string(), "A2");
        assert_eq!(note_for(1046.5).unwrap().to_string(), "C6");
    }

    #[test]
    fn cents_sign_follows_deviation() {
        let sharp = note_for(445.0).unwrap();
        let flat = note_for(435.0).unwrap();
        assert_eq!(sharp.to_string(), "A4");
        assert_eq!(flat.to_string(), "A4");
        assert!(sharp.cents > 0.0);
        assert!(flat.cents < 0.0);
    }

    #[test]
    fn pitch_class_wraps_negative_midi() {
        assert_eq!(PitchClass::from_midi(-1), PitchClass::B);
        assert_eq!(PitchClass::from_midi(-12), PitchClass::C);
        assert_eq!(PitchClass::from_midi(69), PitchClass::A);
    }

    #[test]
    fn two_crossings_in_1024_samples_is_no_pitch() {
        let mut buffer = vec![0.5_f32; 300];
        buffer.extend(vec![-0.5_f32; 400]);
        buffer.extend(vec![0.5_f32; 324]);
        assert_eq!(buffer.len(), 1024);
        assert_eq!(count_zero_crossings(&buffer), 2);

        let estimator = PitchEstimator::default();
        let raw = estimator.raw_frequency(&buffer, 44_100);
        assert!((raw - 43.066).abs() < 0.01, "raw = {raw}");

        let reading = estimator.estimate(&buffer, 44_100);
        assert_eq!(reading, PitchReading::NONE);
        assert_eq!(reading.label(), NO_PITCH_LABEL);
    }

    #[test]
    fn zero_is_counted_as_non_negative() {
        // 0 → -1 is a crossing; 1 → 0 is not.
        assert_eq!(count_zero_crossings(&[1.0, 0.0, 1.0]), 0);
        assert_eq!(count_zero_crossings(&[0.0, -1.0]), 1);
        assert_eq!(count_zero_crossings(&[-1.0, 0.0, -1.0]), 2);
    }

    #[test]
    fn sine_440_estimates_a4() {
        let buffer = sine(440.0, 44_100, 4_410);
        let reading = estimate_pitch(&buffer, 44_100);
        assert!(reading.is_detected());
        assert!((reading.frequency_hz - 440.0).abs() < 6.0, "{}", reading.frequency_hz);
        assert_eq!(reading.label(), "A4");
    }

    #[test]
    fn sine_220_in_a_1024_window() {
        let buffer = sine(220.0, 44_100, 1_024);
        let reading = estimate_pitch(&buffer, 44_100);
        assert_eq!(reading.label(), "A3");
    }

    #[test]
    fn silence_and_empty_buffers_are_no_pitch() {
        assert_eq!(estimate_pitch(&[0.0; 1024], 44_100), PitchReading::NONE);
        assert_eq!(estimate_pitch(&[], 44_100), PitchReading::NONE);
        assert_eq!(estimate_pitch(&[0.5, -0.5], 0), PitchReading::NONE);
    }

    #[test]
    fn high_frequency_noise_is_rejected() {
        // Alternating samples: Nyquist-rate crossings → far above 1200 Hz.
        let buffer: Vec<f32> = (0..1024).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        assert_eq!(estimate_pitch(&buffer, 44_100), PitchReading::NONE);
    }

    #[test]
    fn custom_range_widens_acceptance() {
        let estimator = PitchEstimator::new(40.0, 2_000.0);
        let note = estimator.note_for(55.0).expect("within widened range");
        assert_eq!(note.to_string(), "A1");
    }
}
