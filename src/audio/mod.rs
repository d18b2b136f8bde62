//! Audio input: the capture source the sessions read from.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback (audio-capture thread)
//!            ├─ metering:  average_power_db → AtomicU32 ← PowerMeter::average_power_db
//!            └─ streaming: AudioChunk → ChunkSink → to_mono → pitch estimator
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vocal_trainer::audio::{AudioCapture, CaptureSource};
//!
//! let capture = AudioCapture::new(None); // system default input
//! let meter = capture.open_meter().unwrap();
//! println!("{:.1} dBFS", meter.average_power_db());
//! // dropping `meter` stops the stream
//! ```

pub mod capture;
pub mod mixdown;

pub use capture::{
    AudioCapture, AudioChunk, CaptureError, CaptureGuard, CaptureSource, ChunkSink, PowerMeter,
};
pub use mixdown::to_mono;

// test-only re-export so session and engine tests can script the microphone.
#[cfg(test)]
pub use capture::MockCapture;
