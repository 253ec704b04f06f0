// Types module - Data structures for audio features
//
// This module defines the feature vector produced for every analyzed frame
// and the scalar mappings derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::harmonic;

/// Energy below which a frame is treated as silence
pub const SILENCE_ENERGY: f32 = 1e-10;

/// Energy floor used when converting to decibels
pub const LOUDNESS_FLOOR_ENERGY: f32 = 1e-6;

/// Coarse musical loudness category derived from frame energy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dynamics {
    Silence,
    Pp,
    P,
    Mp,
    Mf,
    F,
    Ff,
}

impl Dynamics {
    /// Energy threshold ladder: pp < 0.1, p < 0.25, mp < 0.4, mf < 0.6,
    /// f < 0.8, else ff
    pub fn from_energy(energy: f32) -> Self {
        if energy < SILENCE_ENERGY {
            Dynamics::Silence
        } else if energy < 0.1 {
            Dynamics::Pp
        } else if energy < 0.25 {
            Dynamics::P
        } else if energy < 0.4 {
            Dynamics::Mp
        } else if energy < 0.6 {
            Dynamics::Mf
        } else if energy < 0.8 {
            Dynamics::F
        } else {
            Dynamics::Ff
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dynamics::Silence => "silence",
            Dynamics::Pp => "pp",
            Dynamics::P => "p",
            Dynamics::Mp => "mp",
            Dynamics::Mf => "mf",
            Dynamics::F => "f",
            Dynamics::Ff => "ff",
        }
    }
}

impl fmt::Display for Dynamics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loudness in dB with the energy floored at [`LOUDNESS_FLOOR_ENERGY`]
///
/// Always finite (>= -120 dB); used wherever loudness is averaged.
pub fn floored_loudness_db(energy: f32) -> f32 {
    20.0 * energy.max(LOUDNESS_FLOOR_ENERGY).log10()
}

/// Features extracted from one audio frame
///
/// `spectrum` and `harmonic_content` have fixed lengths per analyzer
/// (frame_size / 2 and 12).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Peak absolute windowed sample
    pub amplitude: f32,
    /// Mean squared windowed sample
    pub energy: f32,
    /// Strongest bin above the frequency floor, in Hz (0 when silent)
    pub fundamental_frequency: f32,
    /// Energy-weighted mean frequency / Nyquist
    pub spectral_centroid: f32,
    /// Energy-weighted frequency deviation / Nyquist
    pub spectral_spread: f32,
    /// 85% energy frequency / Nyquist
    pub spectral_rolloff: f32,
    /// Energy fraction above the brightness cutoff
    pub brightness: f32,
    /// Bin-to-bin magnitude variation, [0, 1]
    pub roughness: f32,
    /// Squared difference against the previous FFT frame
    pub spectral_flux: f32,
    /// Pitch-class entropy / 4
    pub harmonic_complexity: f32,
    /// Magnitude spectrum
    pub spectrum: Vec<f32>,
    /// Pitch-class energies, strongest class = 1.0
    pub harmonic_content: Vec<f32>,
    /// Energy onset relative to the recent history
    pub is_beat: bool,
    /// Capture time in milliseconds since the analyzer was created
    pub timestamp_ms: f64,
}

impl FeatureVector {
    pub fn pitch(&self) -> f32 {
        self.fundamental_frequency
    }

    /// Note name plus octave of the fundamental, "Rest" when there is none
    pub fn pitch_name(&self) -> String {
        harmonic::pitch_name(self.fundamental_frequency)
    }

    /// Loudness in dB; negative infinity for a silent frame
    pub fn loudness(&self) -> f32 {
        if self.energy < SILENCE_ENERGY {
            f32::NEG_INFINITY
        } else {
            floored_loudness_db(self.energy)
        }
    }

    pub fn dynamics(&self) -> Dynamics {
        Dynamics::from_energy(self.energy)
    }

    pub fn is_silent(&self) -> bool {
        self.energy < SILENCE_ENERGY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamics_ladder() {
        assert_eq!(Dynamics::from_energy(0.0), Dynamics::Silence);
        assert_eq!(Dynamics::from_energy(0.05), Dynamics::Pp);
        assert_eq!(Dynamics::from_energy(0.1), Dynamics::P);
        assert_eq!(Dynamics::from_energy(0.3), Dynamics::Mp);
        assert_eq!(Dynamics::from_energy(0.5), Dynamics::Mf);
        assert_eq!(Dynamics::from_energy(0.7), Dynamics::F);
        assert_eq!(Dynamics::from_energy(0.95), Dynamics::Ff);
        assert_eq!(Dynamics::Mf.to_string(), "mf");
    }

    #[test]
    fn test_floored_loudness() {
        assert!((floored_loudness_db(0.0) + 120.0).abs() < 1e-3);
        assert!((floored_loudness_db(1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_dynamics_serializes_lowercase() {
        let json = serde_json::to_string(&Dynamics::Mp).unwrap();
        assert_eq!(json, "\"mp\"");
    }
}
