//! The two exercise sessions and the events they feed the controller.
//!
//! Sessions never mutate published state themselves.  Their producers (the
//! breath tickers and the pitch capture callback) run on their own
//! execution contexts and post [`SessionEvent`]s; the controller is the
//! only consumer and applies them in order.
//!
//! ```text
//! fast Ticker (100 ms) ── BreathSample{power_db} ──┐
//! slow Ticker (1 s)    ── BreathSecond ────────────┼──▶ controller loop
//! capture callback     ── Pitch{update} ───────────┘
//! ```
//!
//! Every event carries the [`Generation`] of the session that produced it.
//! Each start bumps the generation, so anything still in flight from a
//! stopped session is recognisably stale and dropped.
//!
//! Opening and closing the microphone block until the device answers (a
//! cpal stream is started and joined on its own thread), so both go through
//! `tokio::task::spawn_blocking` and never run on a runtime worker.

pub mod breath;
pub mod pitch;
pub mod ticker;

use tokio::sync::mpsc;

use crate::audio::CaptureError;

pub use breath::{BreathRun, BreathSession, Countdown};
pub use pitch::{analyze_chunk, PitchRun, PitchUpdate};
pub use ticker::Ticker;

/// Monotonic session counter used to discard stale events.
pub type Generation = u64;

/// Message posted by a running session's producers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Fast tick: one metering sample.
    BreathSample { generation: Generation, power_db: f32 },
    /// Slow tick: one countdown second elapsed.
    BreathSecond { generation: Generation },
    /// One analysed capture buffer.
    Pitch {
        generation: Generation,
        update: PitchUpdate,
    },
}

impl SessionEvent {
    pub fn generation(&self) -> Generation {
        match self {
            SessionEvent::BreathSample { generation, .. }
            | SessionEvent::BreathSecond { generation }
            | SessionEvent::Pitch { generation, .. } => *generation,
        }
    }
}

/// Producer side of the controller's event queue.
pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// Run a blocking capture acquisition on the blocking thread pool.
async fn acquire<T, F>(open: F) -> Result<T, CaptureError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CaptureError> + Send + 'static,
{
    tokio::task::spawn_blocking(open)
        .await
        .map_err(|e| CaptureError::Thread(format!("capture open task failed: {e}")))?
}

/// Drop a capture handle on the blocking thread pool.
async fn release<T: Send + 'static>(handle: T) {
    if let Err(e) = tokio::task::spawn_blocking(move || drop(handle)).await {
        log::warn!("capture release task failed: {e}");
    }
}
