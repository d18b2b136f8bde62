//! Line-based console front-end, used by the binary in place of a GUI.
//!
//! # Design
//!
//! Reading stdin blocks, so it runs on a **dedicated OS thread**
//! ([`CommandReader`]) that forwards parsed [`ConsoleCommand`]s over a tokio
//! channel.  Rendering is a pure function of [`PublishedState`] so the main
//! loop can print a status line whenever the engine publishes a change.
//!
//! # Usage
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use vocal_trainer::console::{CommandReader, ConsoleCommand};
//!
//! let (tx, mut rx) = mpsc::channel::<ConsoleCommand>(16);
//! let _reader = CommandReader::start(std::io::BufReader::new(std::io::stdin()), tx).unwrap();
//!
//! // In your async loop:
//! // while let Some(cmd) = rx.recv().await { ... }
//! ```

pub mod reader;

pub use reader::CommandReader;

use crate::engine::{PublishedState, SessionState};

// ---------------------------------------------------------------------------
// ConsoleCommand
// ---------------------------------------------------------------------------

/// Commands typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    StartBreath,
    StartPitch,
    Stop,
    ShowHistory,
    Help,
    Quit,
}

/// Help text listing every command.
pub const HELP: &str = "commands: b(reath)  p(itch)  s(top)  h(istory)  ?/help  q(uit)";

/// Parse one input line.  Case-insensitive; surrounding whitespace ignored.
///
/// Returns `None` for blank or unrecognised input.
///
/// ```
/// use vocal_trainer::console::{parse_command, ConsoleCommand};
///
/// assert_eq!(parse_command("b"), Some(ConsoleCommand::StartBreath));
/// assert_eq!(parse_command("  Pitch "), Some(ConsoleCommand::StartPitch));
/// assert_eq!(parse_command("dance"), None);
/// ```
pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "b" | "breath" => Some(ConsoleCommand::StartBreath),
        "p" | "pitch" => Some(ConsoleCommand::StartPitch),
        "s" | "stop" => Some(ConsoleCommand::Stop),
        "h" | "history" => Some(ConsoleCommand::ShowHistory),
        "?" | "help" => Some(ConsoleCommand::Help),
        "q" | "quit" | "exit" => Some(ConsoleCommand::Quit),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const METER_WIDTH: usize = 20;

/// Horizontal bar for a display level; `1.0` fills the bar, louder input
/// is clipped to full.
fn meter(level: f32) -> String {
    let filled = ((level.clamp(0.0, 1.0) * METER_WIDTH as f32).round() as usize).min(METER_WIDTH);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(METER_WIDTH - filled))
}

/// One status line for the current session.
pub fn render_status(state: &PublishedState) -> String {
    match state.session {
        SessionState::Idle => match state.personal_best() {
            Some(best) => format!(
                "idle | last best {:.1} s | personal best {:.1} s",
                state.best_breath, best
            ),
            None => "idle".to_string(),
        },
        SessionState::RunningBreath => format!(
            "breath {} | {:>2} s left | holding {:>4.1} s | best {:>4.1} s",
            meter(state.audio_level),
            state.remaining_time,
            state.current_breath_seconds,
            state.best_breath
        ),
        SessionState::RunningPitch => format!(
            "pitch {} | {:<3} | {:>7.1} Hz",
            meter(state.audio_level),
            state.current_pitch,
            state.frequency
        ),
    }
}

/// Numbered history listing, most recent first.
pub fn render_history(history: &[f64]) -> String {
    if history.is_empty() {
        return "no breath results yet".to_string();
    }
    history
        .iter()
        .enumerate()
        .map(|(i, secs)| format!("{:>3}. {:.1} s", i + 1, secs))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!(parse_command("breath"), Some(ConsoleCommand::StartBreath));
        assert_eq!(parse_command("P"), Some(ConsoleCommand::StartPitch));
        assert_eq!(parse_command("stop\n"), Some(ConsoleCommand::Stop));
        assert_eq!(parse_command("h"), Some(ConsoleCommand::ShowHistory));
        assert_eq!(parse_command("?"), Some(ConsoleCommand::Help));
        assert_eq!(parse_command("exit"), Some(ConsoleCommand::Quit));
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("   "), None);
    }

    #[test]
    fn meter_is_bounded() {
        assert_eq!(meter(0.0), format!("[{}]", ".".repeat(METER_WIDTH)));
        assert_eq!(meter(1.5), format!("[{}]", "#".repeat(METER_WIDTH)));
        assert_eq!(meter(0.5).matches('#').count(), METER_WIDTH / 2);
        assert_eq!(meter(f32::NAN).len(), METER_WIDTH + 2);
    }

    #[test]
    fn breath_status_shows_countdown() {
        let mut state = PublishedState::default();
        state.session = SessionState::RunningBreath;
        state.remaining_time = 42;
        state.current_breath_seconds = 3.2;
        state.best_breath = 7.9;

        let line = render_status(&state);
        assert!(line.starts_with("breath"));
        assert!(line.contains("42 s left"));
        assert!(line.contains("3.2"));
        assert!(line.contains("7.9"));
    }

    #[test]
    fn pitch_status_shows_note() {
        let mut state = PublishedState::default();
        state.session = SessionState::RunningPitch;
        state.current_pitch = "A4".into();
        state.frequency = 440.0;

        let line = render_status(&state);
        assert!(line.contains("A4"));
        assert!(line.contains("440.0 Hz"));
    }

    #[test]
    fn idle_status_mentions_personal_best() {
        assert_eq!(render_status(&PublishedState::default()), "idle");

        let state = PublishedState::new(60, vec![4.0, 11.5]);
        assert!(render_status(&state).contains("personal best 11.5 s"));
    }

    #[test]
    fn history_listing() {
        assert_eq!(render_history(&[]), "no breath results yet");
        assert_eq!(render_history(&[12.3, 8.0]), "  1. 12.3 s\n  2. 8.0 s");
    }
}
