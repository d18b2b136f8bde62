//! Breath session: a 60-second countdown that measures the longest
//! continuously sustained tone.
//!
//! [`BreathSession`] is the pure state machine.  It is driven by two
//! independent inputs:
//!
//! * **fast tick** (every 100 ms): one metering sample.  The display level
//!   always updates; while time remains, a sustained sample extends the
//!   current run and anything else resets it to zero.
//! * **slow tick** (every 1 s): decrements the countdown, or reports
//!   [`Countdown::Expired`] once it has already reached zero.
//!
//! Run lengths are counted in whole fast ticks and converted to seconds on
//! read, so 600 sustained ticks report exactly `60.0` seconds.
//!
//! [`BreathRun`] binds a session to the microphone meter and the two
//! [`Ticker`]s that produce its events.

use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{measure, LoudnessReading, LEVEL_FLOOR};
use crate::audio::{CaptureError, CaptureSource, PowerMeter};
use crate::config::BreathConfig;

use super::{acquire, release, EventSender, Generation, SessionEvent, Ticker};

// ---------------------------------------------------------------------------
// BreathSession
// ---------------------------------------------------------------------------

/// Outcome of a slow tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// Time remains (or just reached zero on this tick).
    Running,
    /// The countdown was already at zero; the session should stop.
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreathSession {
    remaining_secs: u32,
    sustained_ticks: u32,
    best_ticks: u32,
    tick_secs: f64,
    audio_level: f32,
}

impl BreathSession {
    /// A fresh session with `duration_secs` on the clock, accruing
    /// `fast_tick` per sustained sample.
    pub fn new(duration_secs: u32, fast_tick: Duration) -> Self {
        Self {
            remaining_secs: duration_secs,
            sustained_ticks: 0,
            best_ticks: 0,
            tick_secs: fast_tick.as_secs_f64(),
            audio_level: LEVEL_FLOOR,
        }
    }

    /// Apply one metering sample.
    pub fn on_fast_tick(&mut self, power_db: f32) -> LoudnessReading {
        let reading = measure(power_db);
        self.audio_level = reading.level;

        if self.remaining_secs > 0 {
            if reading.sustained {
                self.sustained_ticks += 1;
                self.best_ticks = self.best_ticks.max(self.sustained_ticks);
            } else {
                self.sustained_ticks = 0;
            }
        }
        reading
    }

    /// Advance the countdown by one second.
    pub fn on_slow_tick(&mut self) -> Countdown {
        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
            Countdown::Running
        } else {
            Countdown::Expired
        }
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn current_sustain_secs(&self) -> f64 {
        self.sustained_ticks as f64 * self.tick_secs
    }

    pub fn best_sustain_secs(&self) -> f64 {
        self.best_ticks as f64 * self.tick_secs
    }

    pub fn audio_level(&self) -> f32 {
        self.audio_level
    }

    /// The value to record in history, if any sustained tone was held.
    pub fn result(&self) -> Option<f64> {
        let best = self.best_sustain_secs();
        (best > 0.0).then_some(best)
    }
}

// ---------------------------------------------------------------------------
// BreathRun
// ---------------------------------------------------------------------------

/// A running breath session: its state plus the producers feeding it.
///
/// The fast ticker's closure polls a shared handle to the meter.  The run
/// keeps its own handle so the device is released off the runtime once both
/// tickers have been joined.
pub struct BreathRun {
    generation: Generation,
    session: BreathSession,
    meter: Arc<dyn PowerMeter>,
    fast: Ticker,
    slow: Ticker,
}

impl BreathRun {
    /// Acquire the meter and start both tickers.
    ///
    /// Nothing is spawned if the meter cannot be opened.
    pub async fn start(
        capture: Arc<dyn CaptureSource>,
        config: &BreathConfig,
        generation: Generation,
        events: EventSender,
    ) -> Result<Self, CaptureError> {
        let meter: Arc<dyn PowerMeter> = acquire(move || capture.open_meter()).await?.into();

        let fast_meter = Arc::clone(&meter);
        let fast_events = events.clone();
        let fast = Ticker::spawn(config.fast_tick(), move || {
            let power_db = fast_meter.average_power_db();
            fast_events
                .send(SessionEvent::BreathSample {
                    generation,
                    power_db,
                })
                .is_ok()
        });

        let slow = Ticker::spawn(config.slow_tick(), move || {
            events
                .send(SessionEvent::BreathSecond { generation })
                .is_ok()
        });

        Ok(Self {
            generation,
            session: BreathSession::new(config.duration_secs, config.fast_tick()),
            meter,
            fast,
            slow,
        })
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn session(&self) -> &BreathSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut BreathSession {
        &mut self.session
    }

    /// Cancel both tickers, release the meter and return the final state.
    pub async fn stop(self) -> BreathSession {
        self.fast.cancel().await;
        self.slow.cancel().await;
        // The fast closure's handle is gone, so this drop closes the device.
        release(self.meter).await;
        self.session
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SILENCE_DB;
    use crate::audio::MockCapture;
    use tokio::sync::mpsc;

    const SUSTAINED_DB: f32 = -30.0;
    const TICK: Duration = Duration::from_millis(100);

    fn session() -> BreathSession {
        BreathSession::new(60, TICK)
    }

    #[test]
    fn new_session_is_reset() {
        let s = session();
        assert_eq!(s.remaining_secs(), 60);
        assert_eq!(s.current_sustain_secs(), 0.0);
        assert_eq!(s.best_sustain_secs(), 0.0);
        assert_eq!(s.audio_level(), LEVEL_FLOOR);
        assert_eq!(s.result(), None);
    }

    #[test]
    fn full_minute_of_sustained_tone() {
        let mut s = session();
        for _ in 0..60 {
            for _ in 0..10 {
                s.on_fast_tick(SUSTAINED_DB);
            }
            assert_eq!(s.on_slow_tick(), Countdown::Running);
        }

        assert_eq!(s.remaining_secs(), 0);
        assert!((s.best_sustain_secs() - 60.0).abs() < 1e-9);
        assert_eq!(s.on_slow_tick(), Countdown::Expired);
        assert_eq!(s.result(), Some(s.best_sustain_secs()));
    }

    #[test]
    fn silence_resets_current_but_keeps_best() {
        let mut s = session();
        for _ in 0..30 {
            s.on_fast_tick(SUSTAINED_DB);
        }
        assert!((s.current_sustain_secs() - 3.0).abs() < 1e-9);

        s.on_fast_tick(SILENCE_DB);
        assert_eq!(s.current_sustain_secs(), 0.0);
        assert!((s.best_sustain_secs() - 3.0).abs() < 1e-9);

        for _ in 0..10 {
            s.on_fast_tick(SUSTAINED_DB);
        }
        assert!((s.current_sustain_secs() - 1.0).abs() < 1e-9);
        assert!((s.best_sustain_secs() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn clipping_is_not_sustained() {
        let mut s = session();
        s.on_fast_tick(SUSTAINED_DB);
        let reading = s.on_fast_tick(-1.0);
        assert!(!reading.sustained);
        assert_eq!(s.current_sustain_secs(), 0.0);
        assert!((s.best_sustain_secs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn no_accrual_after_countdown_ends() {
        let mut s = BreathSession::new(1, TICK);
        s.on_fast_tick(SUSTAINED_DB);
        assert_eq!(s.on_slow_tick(), Countdown::Running);
        assert_eq!(s.remaining_secs(), 0);

        let reading = s.on_fast_tick(-20.0);
        // Level still updates.
        assert!((reading.level - 1.0).abs() < 1e-6);
        assert!((s.audio_level() - 1.0).abs() < 1e-6);
        // Duration does not.
        assert!((s.best_sustain_secs() - 0.1).abs() < 1e-9);
        assert!((s.current_sustain_secs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn best_is_monotonic() {
        let mut s = session();
        let pattern = [SUSTAINED_DB, SUSTAINED_DB, SILENCE_DB, SUSTAINED_DB, -50.0];
        let mut previous = 0.0;
        for db in pattern.iter().cycle().take(200) {
            s.on_fast_tick(*db);
            assert!(s.best_sustain_secs() >= previous);
            previous = s.best_sustain_secs();
        }
        assert!((previous - 0.2).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn run_posts_samples_and_seconds() {
        let mock = MockCapture::new();
        mock.set_power_db(SUSTAINED_DB);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let run = BreathRun::start(Arc::new(mock.clone()), &BreathConfig::default(), 7, tx)
            .await
            .expect("start");
        assert_eq!(mock.open_count(), 1);

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        let run_state = run.stop().await;
        assert_eq!(mock.open_count(), 0);
        // The controller applies events, not the run itself.
        assert_eq!(run_state.remaining_secs(), 60);

        let mut samples = 0;
        let mut seconds = 0;
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.generation(), 7);
            match event {
                SessionEvent::BreathSample { power_db, .. } => {
                    assert_eq!(power_db, SUSTAINED_DB);
                    samples += 1;
                }
                SessionEvent::BreathSecond { .. } => seconds += 1,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(samples, 10);
        assert_eq!(seconds, 1);
    }

    #[tokio::test]
    async fn run_fails_cleanly_without_a_device() {
        let mock = MockCapture::new();
        mock.set_failing(true);
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = BreathRun::start(Arc::new(mock.clone()), &BreathConfig::default(), 1, tx).await;
        assert!(matches!(result, Err(CaptureError::NoDevice)));
        assert_eq!(mock.open_count(), 0);
    }
}
