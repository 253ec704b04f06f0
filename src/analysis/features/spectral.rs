// Spectral module - Frequency-domain feature extraction
//
// All features are computed from the magnitude spectrum (N/2 bins) except
// flux, which compares consecutive packed FFT buffers. Frequency-valued
// features are normalized by the Nyquist frequency.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

/// Spectral feature computation functions
pub struct SpectralFeatures {
    sample_rate: u32,
    frame_size: usize,
    rolloff_threshold: f32,
    brightness_cutoff_hz: f32,
}

impl SpectralFeatures {
    /// Create a new spectral features processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `frame_size` - FFT frame size
    /// * `rolloff_threshold` - Cumulative energy fraction for rolloff (0.85)
    /// * `brightness_cutoff_hz` - Lower edge of the "bright" band (1500 Hz)
    pub fn new(
        sample_rate: u32,
        frame_size: usize,
        rolloff_threshold: f32,
        brightness_cutoff_hz: f32,
    ) -> Self {
        Self {
            sample_rate,
            frame_size,
            rolloff_threshold,
            brightness_cutoff_hz,
        }
    }

    /// Width of one FFT bin in Hz
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.frame_size as f32
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Centre frequency of bin `i` in Hz
    pub fn bin_frequency(&self, i: usize) -> f32 {
        i as f32 * self.bin_width()
    }

    /// Fundamental frequency: the strongest bin at or above `min_frequency_hz`
    ///
    /// Returns 0.0 when the spectrum carries no energy.
    pub fn compute_fundamental(&self, spectrum: &[f32], min_frequency_hz: f32) -> f32 {
        let first_bin = (min_frequency_hz / self.bin_width()).ceil() as usize;

        let peak = spectrum
            .iter()
            .enumerate()
            .skip(first_bin)
            .fold(None, |best: Option<(usize, f32)>, (i, &mag)| match best {
                Some((_, best_mag)) if best_mag >= mag => best,
                _ => Some((i, mag)),
            });

        match peak {
            Some((bin, mag)) if mag > 1e-10 => self.bin_frequency(bin),
            _ => 0.0,
        }
    }

    /// Spectral centroid: energy-weighted mean frequency / Nyquist
    pub fn compute_centroid(&self, spectrum: &[f32]) -> f32 {
        let total_energy: f32 = spectrum.iter().map(|&mag| mag * mag).sum();
        if total_energy <= 1e-20 {
            return 0.0;
        }

        let weighted_sum: f32 = spectrum
            .iter()
            .enumerate()
            .map(|(i, &mag)| self.bin_frequency(i) * mag * mag)
            .sum();

        (weighted_sum / total_energy) / self.nyquist()
    }

    /// Spectral spread: energy-weighted standard deviation around the
    /// centroid, normalized by Nyquist
    ///
    /// # Arguments
    /// * `centroid` - Normalized centroid from [`compute_centroid`](Self::compute_centroid)
    pub fn compute_spread(&self, spectrum: &[f32], centroid: f32) -> f32 {
        let total_energy: f32 = spectrum.iter().map(|&mag| mag * mag).sum();
        if total_energy <= 1e-20 {
            return 0.0;
        }

        let centroid_hz = centroid * self.nyquist();
        let variance: f32 = spectrum
            .iter()
            .enumerate()
            .map(|(i, &mag)| {
                let deviation = self.bin_frequency(i) - centroid_hz;
                deviation * deviation * mag * mag
            })
            .sum::<f32>()
            / total_energy;

        variance.sqrt() / self.nyquist()
    }

    /// Spectral rolloff: frequency below which `rolloff_threshold` of the
    /// energy lies, normalized by Nyquist
    pub fn compute_rolloff(&self, spectrum: &[f32]) -> f32 {
        let total_energy: f32 = spectrum.iter().map(|&mag| mag * mag).sum();
        if total_energy < 1e-10 {
            return 0.0;
        }

        let threshold = self.rolloff_threshold * total_energy;
        let mut cumulative_energy = 0.0;
        for (i, &mag) in spectrum.iter().enumerate() {
            cumulative_energy += mag * mag;
            if cumulative_energy >= threshold {
                return self.bin_frequency(i) / self.nyquist();
            }
        }

        self.bin_frequency(spectrum.len().saturating_sub(1)) / self.nyquist()
    }

    /// Brightness: fraction of spectral energy above the brightness cutoff
    pub fn compute_brightness(&self, spectrum: &[f32]) -> f32 {
        let total_energy: f32 = spectrum.iter().map(|&mag| mag * mag).sum();
        if total_energy < 1e-10 {
            return 0.0;
        }

        let bright_energy: f32 = spectrum
            .iter()
            .enumerate()
            .filter(|(i, _)| self.bin_frequency(*i) > self.brightness_cutoff_hz)
            .map(|(_, &mag)| mag * mag)
            .sum();

        bright_energy / total_energy
    }

    /// Roughness: total bin-to-bin magnitude variation
    ///
    /// Normalized by twice the magnitude sum, which bounds it to [0, 1].
    pub fn compute_roughness(&self, spectrum: &[f32]) -> f32 {
        let magnitude_sum: f32 = spectrum.iter().sum();
        if magnitude_sum <= 1e-10 {
            return 0.0;
        }

        let variation: f32 = spectrum.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
        (variation / (2.0 * magnitude_sum)).min(1.0)
    }

    /// Spectral flux: sum of squared differences between two packed FFT
    /// buffers
    pub fn compute_flux(&self, current: &[f32], previous: &[f32]) -> f32 {
        current
            .iter()
            .zip(previous.iter())
            .map(|(cur, prev)| {
                let diff = cur - prev;
                diff * diff
            })
            .sum()
    }
}
