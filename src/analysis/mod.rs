//! Signal analysis: the two pure transforms the sessions are built on.
//!
//! ```text
//! amplitude buffer ──▶ pitch::estimate_pitch  ──▶ PitchReading (Hz + note)
//! power reading dB ──▶ loudness::measure      ──▶ LoudnessReading (level + sustained)
//! ```
//!
//! Nothing here allocates per call beyond the returned value, and nothing
//! touches session state, so both are safe to run on the audio thread.

pub mod loudness;
pub mod pitch;

pub use loudness::{
    average_power_db, is_sustained, measure, normalized_level, LoudnessReading, LEVEL_FLOOR,
    SILENCE_DB,
};
pub use pitch::{
    count_zero_crossings, estimate_pitch, note_for, Note, PitchClass, PitchEstimator,
    PitchReading, NO_PITCH_LABEL,
};
