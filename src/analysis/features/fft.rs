// FFT module - windowed real FFT with packed output
//
// The analyzer keeps its FFT output in the packed real layout used by
// in-place real transforms:
//   packed[0]      = Re(X[0])        (DC, purely real)
//   packed[1]      = Re(X[N/2])      (Nyquist, purely real)
//   packed[2k]     = Re(X[k])        for k in 1..N/2
//   packed[2k + 1] = Im(X[k])
// Spectral flux is computed on this raw buffer, the magnitude spectrum is
// derived from it.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT processor producing packed real spectra from fixed-size frames
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    frame_size: usize,
    /// Hann window (pre-computed)
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftProcessor {
    /// Create a new FFT processor for `frame_size` samples
    pub fn new(frame_size: usize) -> Self {
        let window = hann_window(frame_size);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(frame_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft,
            frame_size,
            window,
            buffer: vec![Complex::new(0.0, 0.0); frame_size],
            scratch,
        }
    }

    /// Multiply a frame by the Hann window
    ///
    /// `frame` must already be exactly `frame_size` samples long.
    pub fn apply_window(&self, frame: &[f32]) -> Vec<f32> {
        frame
            .iter()
            .zip(self.window.iter())
            .map(|(&sample, &w)| sample * w)
            .collect()
    }

    /// Forward FFT of an already-windowed frame, returned in packed layout
    pub fn forward_packed(&mut self, windowed: &[f32]) -> Vec<f32> {
        for (slot, &sample) in self.buffer.iter_mut().zip(windowed.iter()) {
            *slot = Complex::new(sample, 0.0);
        }
        for slot in self.buffer.iter_mut().skip(windowed.len()) {
            *slot = Complex::new(0.0, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let half = self.frame_size / 2;
        let mut packed = vec![0.0_f32; self.frame_size];
        packed[0] = self.buffer[0].re;
        packed[1] = self.buffer[half].re;
        for k in 1..half {
            packed[2 * k] = self.buffer[k].re;
            packed[2 * k + 1] = self.buffer[k].im;
        }
        packed
    }
}

/// Magnitude spectrum (length N/2) from a packed real FFT buffer
///
/// Bin 0 is the DC magnitude alone; the Nyquist term stays in the packed
/// buffer and is not part of the spectrum.
pub fn magnitude_spectrum(packed: &[f32]) -> Vec<f32> {
    let half = packed.len() / 2;
    let mut magnitudes = Vec::with_capacity(half);
    if half == 0 {
        return magnitudes;
    }

    magnitudes.push(packed[0].abs());
    for k in 1..half {
        let re = packed[2 * k];
        let im = packed[2 * k + 1];
        magnitudes.push((re * re + im * im).sqrt());
    }
    magnitudes
}

/// Hann window `w[i] = 0.5 * (1 - cos(2*pi*i / (N - 1)))`
pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / (size as f32 - 1.0)).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_endpoints() {
        let window = hann_window(2048);
        assert!(window[0].abs() < 1e-6);
        assert!(window[2047].abs() < 1e-6);
        assert!((window[1023] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_packed_layout_dc_and_nyquist() {
        let mut fft = FftProcessor::new(8);
        // Constant signal: all energy in DC
        let packed = fft.forward_packed(&[1.0; 8]);
        assert!((packed[0] - 8.0).abs() < 1e-4);
        assert!(packed[1].abs() < 1e-4);

        // Alternating signal: all energy at Nyquist
        let alternating: Vec<f32> = (0..8).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let packed = fft.forward_packed(&alternating);
        assert!(packed[0].abs() < 1e-4);
        assert!((packed[1] - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_magnitude_spectrum_length() {
        let mut fft = FftProcessor::new(2048);
        let packed = fft.forward_packed(&vec![0.0; 2048]);
        let spectrum = magnitude_spectrum(&packed);
        assert_eq!(spectrum.len(), 1024);
        assert!(spectrum.iter().all(|&m| m == 0.0));
    }
}
