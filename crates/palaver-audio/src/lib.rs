//! Palaver audio crate - PCM16 decoding and playback sink abstraction.
//!
//! The engine hands speech bytes from the provider to [`decode_pcm16`] and
//! routes the resulting buffer to an [`AudioSink`]. Actually reaching a
//! speaker is a platform I/O concern behind the trait; a mock sink records
//! playback for tests.

use std::sync::Mutex;

// =============================================================================
// Errors
// =============================================================================

/// Errors from the audio subsystem.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("playback device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("playback failed: {0}")]
    PlaybackFailed(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

// =============================================================================
// Buffer + decode
// =============================================================================

/// A decoded, playable audio buffer: one `f32` sample vector per channel,
/// values normalized to `[-1, 1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    /// `channels[c][f]` is frame `f` of channel `c`.
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / f64::from(self.sample_rate)
    }
}

/// Decode interleaved little-endian 16-bit signed PCM into a per-channel
/// float buffer.
///
/// Samples are normalized by division by 32768 so the range is `[-1, 1)`.
/// A trailing odd byte, and trailing samples short of a full frame, are
/// truncated rather than padded or treated as an error.
pub fn decode_pcm16(data: &[u8], sample_rate: u32, num_channels: usize) -> AudioBuffer {
    if num_channels == 0 {
        return AudioBuffer {
            sample_rate,
            channels: Vec::new(),
        };
    }

    let samples: Vec<i16> = data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let frame_count = samples.len() / num_channels;

    let mut channels = vec![Vec::with_capacity(frame_count); num_channels];
    for frame in 0..frame_count {
        for (channel, out) in channels.iter_mut().enumerate() {
            out.push(f32::from(samples[frame * num_channels + channel]) / 32768.0);
        }
    }

    AudioBuffer {
        sample_rate,
        channels,
    }
}

// =============================================================================
// Playback sink
// =============================================================================

/// Destination for decoded audio buffers.
pub trait AudioSink: Send + Sync {
    /// Queue a buffer for playback.
    fn play(&self, buffer: &AudioBuffer) -> Result<()>;
}

/// Sink that discards audio after logging it. Useful for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn play(&self, buffer: &AudioBuffer) -> Result<()> {
        tracing::debug!(
            frames = buffer.frame_count(),
            channels = buffer.channel_count(),
            sample_rate = buffer.sample_rate,
            "Discarding audio buffer (null sink)"
        );
        Ok(())
    }
}

/// Mock sink that records every played buffer for assertions.
#[derive(Debug, Default)]
pub struct MockAudioSink {
    played: Mutex<Vec<AudioBuffer>>,
}

impl MockAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play_count(&self) -> usize {
        self.played.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn played(&self) -> Vec<AudioBuffer> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl AudioSink for MockAudioSink {
    fn play(&self, buffer: &AudioBuffer) -> Result<()> {
        self.played
            .lock()
            .map_err(|_| AudioError::PlaybackFailed("sink lock poisoned".to_string()))?
            .push(buffer.clone());
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    // -------------------------------------------------------------------------
    // decode_pcm16
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_mono_normalization() {
        let bytes = pcm_bytes(&[16384, -16384]);
        let buffer = decode_pcm16(&bytes, 24_000, 1);

        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.frame_count(), 2);
        assert!((buffer.channels[0][0] - 0.5).abs() < 1e-4);
        assert!((buffer.channels[0][1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decode_full_scale_bounds() {
        let bytes = pcm_bytes(&[i16::MIN, i16::MAX]);
        let buffer = decode_pcm16(&bytes, 24_000, 1);

        assert_eq!(buffer.channels[0][0], -1.0);
        // i16::MAX / 32768 stays strictly below 1.0.
        assert!(buffer.channels[0][1] < 1.0);
        assert!(buffer.channels[0][1] > 0.999);
    }

    #[test]
    fn test_decode_stereo_deinterleaves() {
        // Interleaved L0 R0 L1 R1.
        let bytes = pcm_bytes(&[100, -100, 200, -200]);
        let buffer = decode_pcm16(&bytes, 48_000, 2);

        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 2);
        assert!((buffer.channels[0][0] - 100.0 / 32768.0).abs() < 1e-6);
        assert!((buffer.channels[1][0] + 100.0 / 32768.0).abs() < 1e-6);
        assert!((buffer.channels[0][1] - 200.0 / 32768.0).abs() < 1e-6);
        assert!((buffer.channels[1][1] + 200.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_truncates_trailing_byte() {
        let mut bytes = pcm_bytes(&[1000, 2000]);
        bytes.push(0xFF); // dangling half-sample
        let buffer = decode_pcm16(&bytes, 24_000, 1);
        assert_eq!(buffer.frame_count(), 2);
    }

    #[test]
    fn test_decode_truncates_partial_frame() {
        // Three samples into two channels: one full frame, remainder dropped.
        let bytes = pcm_bytes(&[1, 2, 3]);
        let buffer = decode_pcm16(&bytes, 24_000, 2);
        assert_eq!(buffer.frame_count(), 1);
        assert_eq!(buffer.channel_count(), 2);
    }

    #[test]
    fn test_decode_empty_input() {
        let buffer = decode_pcm16(&[], 24_000, 1);
        assert_eq!(buffer.frame_count(), 0);
        assert_eq!(buffer.channel_count(), 1);
    }

    #[test]
    fn test_decode_zero_channels() {
        let buffer = decode_pcm16(&pcm_bytes(&[1, 2]), 24_000, 0);
        assert_eq!(buffer.channel_count(), 0);
        assert_eq!(buffer.frame_count(), 0);
    }

    #[test]
    fn test_duration() {
        let bytes = pcm_bytes(&[0; 24_000]);
        let buffer = decode_pcm16(&bytes, 24_000, 1);
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);

        let empty = AudioBuffer {
            sample_rate: 0,
            channels: vec![vec![0.0]],
        };
        assert_eq!(empty.duration_secs(), 0.0);
    }

    // -------------------------------------------------------------------------
    // Sinks
    // -------------------------------------------------------------------------

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullAudioSink;
        let buffer = decode_pcm16(&pcm_bytes(&[1, 2, 3]), 24_000, 1);
        assert!(sink.play(&buffer).is_ok());
    }

    #[test]
    fn test_mock_sink_records_playback() {
        let sink = MockAudioSink::new();
        assert_eq!(sink.play_count(), 0);

        let buffer = decode_pcm16(&pcm_bytes(&[16384]), 24_000, 1);
        sink.play(&buffer).unwrap();
        sink.play(&buffer).unwrap();

        assert_eq!(sink.play_count(), 2);
        assert_eq!(sink.played()[0], buffer);
    }
}
