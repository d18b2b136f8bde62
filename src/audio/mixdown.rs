//! Channel downmixing for analysis.
//!
//! Pitch estimation runs on a single channel.  cpal delivers interleaved
//! frames, so multi-channel buffers are averaged frame by frame first.

use std::borrow::Cow;

/// Average interleaved `channels` down to one channel.
///
/// * `channels == 1` borrows the input unchanged (no allocation on the
///   common mono-microphone path).
/// * `channels == 0` yields an empty buffer.
/// * A trailing partial frame is ignored.
///
/// ```rust
/// use vocal_trainer::audio::to_mono;
///
/// let stereo = [0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn to_mono(samples: &[f32], channels: u16) -> Cow<'_, [f32]> {
    match channels {
        0 => Cow::Owned(Vec::new()),
        1 => Cow::Borrowed(samples),
        n => {
            let n = n as usize;
            Cow::Owned(
                samples
                    .chunks_exact(n)
                    .map(|frame| frame.iter().sum::<f32>() / n as f32)
                    .collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_borrowed() {
        let input = [0.1_f32, 0.2, 0.3];
        let out = to_mono(&input, 1);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, &input);
    }

    #[test]
    fn stereo_frames_are_averaged() {
        let out = to_mono(&[1.0_f32, -1.0, 0.5, 0.5], 2);
        assert_eq!(out.len(), 2);
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn partial_trailing_frame_is_dropped() {
        let out = to_mono(&[0.4_f32, 0.4, 0.4, 0.4, 0.9], 4);
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn zero_channels_is_empty() {
        assert!(to_mono(&[1.0_f32, 2.0], 0).is_empty());
    }
}
