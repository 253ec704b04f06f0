// Temporal module - PCM decoding and time-domain features
//
// Raw capture buffers arrive as little-endian signed 16-bit mono PCM. They are
// decoded to floats in [-1, 1] and fitted to exactly one analysis frame before
// windowing. Amplitude and energy are measured on the windowed frame.

use std::collections::VecDeque;

use crate::error::AnalyzerError;

/// Energy must exceed the rolling mean by this factor to count as a beat
const BEAT_ENERGY_RATIO: f32 = 1.5;

/// Frames below this energy never count as beats
const MIN_BEAT_ENERGY: f32 = 1e-4;

/// Minimum history before beat decisions are made
const MIN_BEAT_HISTORY: usize = 8;

/// Decode little-endian i16 PCM bytes into normalized floats
///
/// # Errors
/// - `EmptyBuffer` when `bytes` is empty
/// - `OddLength` when `bytes` does not hold whole 16-bit samples
pub fn decode_pcm16_le(bytes: &[u8]) -> Result<Vec<f32>, AnalyzerError> {
    if bytes.is_empty() {
        return Err(AnalyzerError::EmptyBuffer);
    }
    if bytes.len() % 2 != 0 {
        return Err(AnalyzerError::OddLength { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

/// Encode normalized floats as little-endian i16 PCM (clamped to [-1, 1])
///
/// The inverse of [`decode_pcm16_le`], used by hosts that capture floats.
pub fn encode_pcm16_le(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| ((s.clamp(-1.0, 1.0) * 32767.0).round() as i16).to_le_bytes())
        .collect()
}

/// Truncate or zero-pad `samples` to exactly `frame_size`
pub fn fit_to_frame(samples: &[f32], frame_size: usize) -> Vec<f32> {
    let mut frame = vec![0.0_f32; frame_size];
    let n = samples.len().min(frame_size);
    frame[..n].copy_from_slice(&samples[..n]);
    frame
}

/// Peak absolute value of a frame
pub fn compute_amplitude(frame: &[f32]) -> f32 {
    frame.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Mean squared sample value of a frame
pub fn compute_energy(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32
}

/// Rolling energy history used to flag energy onsets (beats)
pub struct EnergyTracker {
    history: VecDeque<f32>,
    capacity: usize,
}

impl EnergyTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a frame's energy and report whether it stands out as a beat
    /// against the frames before it
    pub fn observe(&mut self, energy: f32) -> bool {
        let is_beat = if self.history.len() >= MIN_BEAT_HISTORY.min(self.capacity) {
            let mean = self.history.iter().sum::<f32>() / self.history.len() as f32;
            energy > MIN_BEAT_ENERGY && energy > mean * BEAT_ENERGY_RATIO
        } else {
            false
        };

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(energy);
        is_beat
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pcm16_le() {
        let bytes = [0x00, 0x00, 0xFF, 0x7F, 0x00, 0x80];
        let samples = decode_pcm16_le(&bytes).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 32767.0 / 32768.0).abs() < 1e-6);
        assert_eq!(samples[2], -1.0);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(decode_pcm16_le(&[]), Err(AnalyzerError::EmptyBuffer));
        assert_eq!(
            decode_pcm16_le(&[1, 2, 3]),
            Err(AnalyzerError::OddLength { len: 3 })
        );
    }

    #[test]
    fn test_encode_decode_preserves_level() {
        let bytes = encode_pcm16_le(&[0.5, -0.25, 2.0]);
        let samples = decode_pcm16_le(&bytes).unwrap();
        assert!((samples[0] - 0.5).abs() < 1e-3);
        assert!((samples[1] + 0.25).abs() < 1e-3);
        // Clamped
        assert!(samples[2] < 1.0 && samples[2] > 0.99);
    }

    #[test]
    fn test_fit_to_frame_pads_and_truncates() {
        assert_eq!(fit_to_frame(&[1.0, 2.0], 4), vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(fit_to_frame(&[1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
    }

    #[test]
    fn test_amplitude_and_energy() {
        let frame = [0.5, -1.0, 0.0, 0.5];
        assert_eq!(compute_amplitude(&frame), 1.0);
        assert!((compute_energy(&frame) - 0.375).abs() < 1e-6);
        assert_eq!(compute_energy(&[]), 0.0);
    }

    #[test]
    fn test_energy_tracker_flags_onset() {
        let mut tracker = EnergyTracker::new(43);
        for _ in 0..10 {
            assert!(!tracker.observe(0.01));
        }
        assert!(tracker.observe(0.2));
        assert!(!tracker.observe(0.0));
        assert_eq!(tracker.len(), 12);

        tracker.clear();
        assert!(tracker.is_empty());
    }
}
