//! Microphone capture via `cpal`.
//!
//! The sessions only need two primitives from the microphone, expressed by
//! the [`CaptureSource`] trait:
//!
//! * **metering**: [`CaptureSource::open_meter`] returns a [`PowerMeter`]
//!   that can be polled for the current average power in dBFS, and
//! * **streaming**: [`CaptureSource::open_stream`] delivers every hardware
//!   buffer as an [`AudioChunk`] to a callback.
//!
//! Both return RAII values: dropping the meter or the [`CaptureGuard`] stops
//! the underlying stream and releases the device.
//!
//! [`AudioCapture`] is the production implementation.  `cpal::Stream` is not
//! `Send` on every platform, so each stream lives on its own `audio-capture`
//! thread and the returned guard only holds a stop channel and the join
//! handle.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use thiserror::Error;

use crate::analysis::{average_power_db, SILENCE_DB};

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the capture callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

/// Callback invoked on the capture thread for every delivered buffer.
///
/// Must return quickly; it runs inside the hardware callback.
pub type ChunkSink = Box<dyn FnMut(AudioChunk) + Send + 'static>;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while acquiring the capture device.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device `{0}` not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio capture thread failed: {0}")]
    Thread(String),
}

// ---------------------------------------------------------------------------
// CaptureSource
// ---------------------------------------------------------------------------

/// Polled power meter.  Dropping it releases the capture device.
///
/// `Sync` because a breath run shares the meter with its fast ticker.
pub trait PowerMeter: Send + Sync {
    /// Average input power in dBFS, roughly `[-160, 0]`; `-160` is silence.
    fn average_power_db(&self) -> f32;
}

/// Keeps a streaming capture alive.  Dropping it stops delivery.
pub struct CaptureGuard {
    _inner: Box<dyn Send>,
}

impl CaptureGuard {
    pub fn new(inner: impl Send + 'static) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

/// The two capture primitives the sessions depend on.
///
/// Implementations must be `Send + Sync` so the controller can hold one
/// behind an `Arc<dyn CaptureSource>`.  Both calls may block until the
/// device has started, and dropping what they return may block until it
/// has stopped; async callers go through `spawn_blocking`.
pub trait CaptureSource: Send + Sync {
    /// Start level metering.
    fn open_meter(&self) -> Result<Box<dyn PowerMeter>, CaptureError>;

    /// Start streaming buffers into `sink`.
    fn open_stream(&self, sink: ChunkSink) -> Result<CaptureGuard, CaptureError>;
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// Owns the thread that owns a running `cpal::Stream`.
///
/// Dropping the handle closes the stop channel; the thread then drops the
/// stream and exits, and the drop waits for it so the device is free before
/// the next acquisition.
struct StreamHandle {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("audio capture thread panicked during shutdown");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture built on top of `cpal`.
///
/// The device is resolved on every `open_*` call rather than once at
/// startup, so a microphone plugged in (or a permission granted) after
/// launch is picked up by the next session.
#[derive(Debug, Clone, Default)]
pub struct AudioCapture {
    /// Input device name; `None` means the host default.
    device_name: Option<String>,
}

impl AudioCapture {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    fn resolve_device(device_name: Option<&str>) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        match device_name {
            None => host.default_input_device().ok_or(CaptureError::NoDevice),
            Some(wanted) => host
                .input_devices()?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceNotFound(wanted.to_string())),
        }
    }

    /// Build and play an input stream on a dedicated thread.
    ///
    /// `on_data` receives interleaved `f32` samples plus the stream's sample
    /// rate and channel count.  Returns once the stream is playing or has
    /// failed to start.
    fn spawn_stream<F>(&self, on_data: F) -> Result<StreamHandle, CaptureError>
    where
        F: FnMut(&[f32], u32, u16) + Send + 'static,
    {
        let device_name = self.device_name.clone();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), CaptureError>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let stream = match Self::open_device_stream(device_name.as_deref(), on_data) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Park until the handle is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                log::debug!("audio capture stream closed");
            })
            .map_err(|e| CaptureError::Thread(e.to_string()))?;

        let handle = StreamHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::Thread(
                "capture thread exited before reporting".into(),
            )),
        }
    }

    fn open_device_stream<F>(
        device_name: Option<&str>,
        on_data: F,
    ) -> Result<cpal::Stream, CaptureError>
    where
        F: FnMut(&[f32], u32, u16) + Send + 'static,
    {
        let device = Self::resolve_device(device_name)?;
        let supported = device.default_input_config()?;
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        log::debug!(
            "opening input stream: {} Hz, {} ch, {:?}",
            config.sample_rate.0,
            config.channels,
            format
        );

        let stream = match format {
            cpal::SampleFormat::F32 => build_input::<f32, F>(&device, &config, on_data)?,
            cpal::SampleFormat::I16 => build_input::<i16, F>(&device, &config, on_data)?,
            cpal::SampleFormat::U16 => build_input::<u16, F>(&device, &config, on_data)?,
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        };

        stream.play()?;
        Ok(stream)
    }
}

/// Build an input stream for sample type `T`, converting every buffer to
/// `f32` before handing it to `on_data`.
fn build_input<T, F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut on_data: F,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
    F: FnMut(&[f32], u32, u16) + Send + 'static,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let mut scratch: Vec<f32> = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            scratch.clear();
            scratch.extend(data.iter().map(|&s| f32::from_sample(s)));
            on_data(&scratch, sample_rate, channels);
        },
        |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
        },
        None, // no timeout
    )
}

/// Meter backed by a running input stream.  Stores the latest buffer's
/// power as `f32` bits.
struct StreamMeter {
    power_bits: Arc<AtomicU32>,
    _stream: StreamHandle,
}

impl PowerMeter for StreamMeter {
    fn average_power_db(&self) -> f32 {
        f32::from_bits(self.power_bits.load(Ordering::Relaxed))
    }
}

impl CaptureSource for AudioCapture {
    fn open_meter(&self) -> Result<Box<dyn PowerMeter>, CaptureError> {
        let power_bits = Arc::new(AtomicU32::new(SILENCE_DB.to_bits()));
        let writer = Arc::clone(&power_bits);

        let stream = self.spawn_stream(move |samples, _, _| {
            writer.store(average_power_db(samples).to_bits(), Ordering::Relaxed);
        })?;

        log::info!("microphone metering started");
        Ok(Box::new(StreamMeter {
            power_bits,
            _stream: stream,
        }))
    }

    fn open_stream(&self, mut sink: ChunkSink) -> Result<CaptureGuard, CaptureError> {
        let stream = self.spawn_stream(move |samples, sample_rate, channels| {
            sink(AudioChunk {
                samples: samples.to_vec(),
                sample_rate,
                channels,
            });
        })?;

        log::info!("microphone streaming started");
        Ok(CaptureGuard::new(stream))
    }
}

// ---------------------------------------------------------------------------
// MockCapture (test only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockCapture;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
