//! Session lifecycle enum and the published state snapshot.
//!
//! [`SessionState`] says which exercise (if any) is running.
//! [`PublishedState`] is everything a presentation layer may read.  Only the
//! controller writes it; readers get clones via a `watch` channel.

use crate::analysis::{LEVEL_FLOOR, NO_PITCH_LABEL};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Which exercise currently owns the microphone.
///
/// ```text
/// Idle ──start_breath──▶ RunningBreath ──stop / countdown expired──▶ Idle
/// Idle ──start_pitch───▶ RunningPitch  ──stop──────────────────────▶ Idle
/// Running* ──start_*──▶ (stop current) ──▶ Running*
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    RunningBreath,
    RunningPitch,
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::RunningBreath => "Breath",
            SessionState::RunningPitch => "Pitch",
        }
    }
}

// ---------------------------------------------------------------------------
// PublishedState
// ---------------------------------------------------------------------------

/// Read-only snapshot for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedState {
    pub session: SessionState,

    /// Display level.  Breath sessions publish the normalized meter level
    /// (never below 0.2); pitch sessions publish the coarse first-sample
    /// magnitude.
    pub audio_level: f32,

    /// Length of the tone being held right now, in seconds.
    pub current_breath_seconds: f64,

    /// Longest tone held in the current (or last) breath session.
    pub best_breath: f64,

    /// Seconds left on the breath countdown.
    pub remaining_time: u32,

    /// Note label such as `"A4"`, or `"-"` when no pitch is detected.
    pub current_pitch: String,

    /// Estimated frequency in Hz; `0.0` when no pitch is detected.
    pub frequency: f32,

    /// Past best-breath results, most recent first.
    pub history: Vec<f64>,
}

impl PublishedState {
    pub fn new(duration_secs: u32, history: Vec<f64>) -> Self {
        Self {
            session: SessionState::Idle,
            audio_level: LEVEL_FLOOR,
            current_breath_seconds: 0.0,
            best_breath: 0.0,
            remaining_time: duration_secs,
            current_pitch: NO_PITCH_LABEL.to_string(),
            frequency: 0.0,
            history,
        }
    }

    pub fn personal_best(&self) -> Option<f64> {
        self.history.iter().copied().reduce(f64::max)
    }
}

impl Default for PublishedState {
    fn default() -> Self {
        Self::new(60, Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
        assert!(!SessionState::Idle.is_running());
        assert!(SessionState::RunningBreath.is_running());
        assert!(SessionState::RunningPitch.is_running());
    }

    #[test]
    fn labels() {
        assert_eq!(SessionState::Idle.label(), "Idle");
        assert_eq!(SessionState::RunningBreath.label(), "Breath");
        assert_eq!(SessionState::RunningPitch.label(), "Pitch");
    }

    #[test]
    fn initial_published_state() {
        let state = PublishedState::new(45, vec![3.0, 9.5, 1.2]);
        assert_eq!(state.session, SessionState::Idle);
        assert_eq!(state.remaining_time, 45);
        assert_eq!(state.audio_level, LEVEL_FLOOR);
        assert_eq!(state.current_pitch, NO_PITCH_LABEL);
        assert_eq!(state.frequency, 0.0);
        assert_eq!(state.personal_best(), Some(9.5));
    }

    #[test]
    fn empty_history_has_no_personal_best() {
        assert_eq!(PublishedState::default().personal_best(), None);
    }
}
