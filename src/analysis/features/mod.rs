// SpectralAnalyzer - raw PCM frame to feature vector
//
// Module organization:
// - types: FeatureVector, Dynamics and derived scalar mappings
// - temporal: PCM decoding, amplitude/energy, rolling energy history
// - fft: Hann window and packed real FFT
// - spectral: centroid, spread, rolloff, brightness, roughness, flux
// - harmonic: pitch-class profile, entropy complexity, note names
// - mod.rs: Coordinator (SpectralAnalyzer)
//
// Pipeline per frame:
// 1. Decode LE i16 PCM, fit to frame_size
// 2. Hann window
// 3. Real FFT (packed layout), magnitude spectrum of frame_size / 2 bins
// 4. Time-domain and spectral descriptors
// 5. Flux against the retained previous FFT buffer, beat against the
//    retained energy history
//
// The analyzer is stateful (previous FFT frame, energy history) and is not
// meant for concurrent use; callers serialize access.

mod fft;
pub mod harmonic;
mod spectral;
pub mod temporal;
mod types;

pub use harmonic::{HARMONIC_COMPLEXITY_SCALE, PITCH_CLASSES};
pub use temporal::{decode_pcm16_le, encode_pcm16_le};
pub use types::{floored_loudness_db, Dynamics, FeatureVector, SILENCE_ENERGY};

use tokio::time::Instant;

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use fft::{magnitude_spectrum, FftProcessor};
use spectral::SpectralFeatures;
use temporal::EnergyTracker;

/// SpectralAnalyzer coordinates the per-frame DSP pipeline
pub struct SpectralAnalyzer {
    fft_processor: FftProcessor,
    spectral_features: SpectralFeatures,
    energy_tracker: EnergyTracker,
    /// Packed FFT buffer of the previous frame, zeros before the first frame
    previous_fft: Vec<f32>,
    min_frequency_hz: f32,
    frame_size: usize,
    sample_rate: u32,
    epoch: Instant,
}

impl SpectralAnalyzer {
    /// Create a new analyzer
    ///
    /// `config.frame_size` is expected to be validated (power of two).
    pub fn new(config: &AnalyzerConfig) -> Self {
        let frame_size = config.frame_size;

        Self {
            fft_processor: FftProcessor::new(frame_size),
            spectral_features: SpectralFeatures::new(
                config.sample_rate,
                frame_size,
                config.rolloff_threshold,
                config.brightness_cutoff_hz,
            ),
            energy_tracker: EnergyTracker::new(config.energy_history_len),
            previous_fft: vec![0.0; frame_size],
            min_frequency_hz: config.min_frequency_hz,
            frame_size,
            sample_rate: config.sample_rate,
            epoch: Instant::now(),
        }
    }

    /// Create with default configuration (2048 samples at 44.1 kHz)
    pub fn new_default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of magnitude bins in every produced spectrum
    pub fn spectrum_len(&self) -> usize {
        self.frame_size / 2
    }

    /// Width of one spectrum bin in Hz
    pub fn bin_width(&self) -> f32 {
        self.spectral_features.bin_width()
    }

    /// Analyze a raw little-endian 16-bit PCM buffer
    ///
    /// # Errors
    /// Only malformed input fails (empty or odd-length buffers). Silence
    /// yields a valid, mostly-zero vector.
    pub fn analyze(&mut self, raw_pcm: &[u8]) -> Result<FeatureVector, AnalyzerError> {
        let samples = decode_pcm16_le(raw_pcm)?;
        Ok(self.analyze_samples(&samples))
    }

    /// Analyze already-decoded samples in [-1, 1]
    ///
    /// Input is truncated or zero-padded to exactly one frame.
    pub fn analyze_samples(&mut self, samples: &[f32]) -> FeatureVector {
        let timestamp_ms = self.epoch.elapsed().as_secs_f64() * 1000.0;

        let frame = temporal::fit_to_frame(samples, self.frame_size);
        let windowed = self.fft_processor.apply_window(&frame);

        let amplitude = temporal::compute_amplitude(&windowed);
        let energy = temporal::compute_energy(&windowed);

        let packed = self.fft_processor.forward_packed(&windowed);
        let spectrum = magnitude_spectrum(&packed);

        let features = &self.spectral_features;
        let fundamental_frequency = features.compute_fundamental(&spectrum, self.min_frequency_hz);
        let spectral_centroid = features.compute_centroid(&spectrum);
        let spectral_spread = features.compute_spread(&spectrum, spectral_centroid);
        let spectral_rolloff = features.compute_rolloff(&spectrum);
        let brightness = features.compute_brightness(&spectrum);
        let roughness = features.compute_roughness(&spectrum);
        let spectral_flux = features.compute_flux(&packed, &self.previous_fft);

        let harmonic_content = harmonic::compute_harmonic_content(
            &spectrum,
            features.bin_width(),
            self.min_frequency_hz,
        );
        let harmonic_complexity = harmonic::compute_harmonic_complexity(&harmonic_content);

        let is_beat = self.energy_tracker.observe(energy);
        self.previous_fft = packed;

        FeatureVector {
            amplitude,
            energy,
            fundamental_frequency,
            spectral_centroid,
            spectral_spread,
            spectral_rolloff,
            brightness,
            roughness,
            spectral_flux,
            harmonic_complexity,
            spectrum,
            harmonic_content,
            is_beat,
            timestamp_ms,
        }
    }

    /// Forget the previous frame and the energy history
    pub fn reset(&mut self) {
        self.previous_fft.iter_mut().for_each(|v| *v = 0.0);
        self.energy_tracker.clear();
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new_default()
    }
}
