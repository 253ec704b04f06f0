// FeatureStats - reduction of a sampling session
//
// Population mean and variance of energy, pitch and brightness over the
// collected vectors. An empty session reduces to all-zero statistics.

use serde::{Deserialize, Serialize};

use crate::analysis::features::floored_loudness_db;
use crate::analysis::FeatureVector;

/// Summary statistics of one sampling session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FeatureStats {
    /// Last timestamp minus first timestamp, in milliseconds
    pub duration_ms: f64,
    pub sample_count: usize,
    pub energy_mean: f32,
    pub energy_variance: f32,
    pub pitch_mean: f32,
    pub pitch_variance: f32,
    pub brightness_mean: f32,
    pub brightness_variance: f32,
    /// Mean loudness in dB, silent frames counted at the -120 dB floor
    pub loudness_mean_db: f32,
}

impl FeatureStats {
    /// Reduce a sequence of feature vectors
    ///
    /// Never panics; `vectors` may be empty.
    pub fn from_vectors(vectors: &[FeatureVector]) -> Self {
        let (first, last) = match (vectors.first(), vectors.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Self::default(),
        };

        let (energy_mean, energy_variance) = mean_and_variance(vectors, |v| v.energy);
        let (pitch_mean, pitch_variance) = mean_and_variance(vectors, |v| v.pitch());
        let (brightness_mean, brightness_variance) =
            mean_and_variance(vectors, |v| v.brightness);
        let (loudness_mean_db, _) = mean_and_variance(vectors, |v| floored_loudness_db(v.energy));

        Self {
            duration_ms: (last.timestamp_ms - first.timestamp_ms).max(0.0),
            sample_count: vectors.len(),
            energy_mean,
            energy_variance,
            pitch_mean,
            pitch_variance,
            brightness_mean,
            brightness_variance,
            loudness_mean_db,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

/// Population mean and variance of one field
fn mean_and_variance<F>(vectors: &[FeatureVector], field: F) -> (f32, f32)
where
    F: Fn(&FeatureVector) -> f32,
{
    if vectors.is_empty() {
        return (0.0, 0.0);
    }

    let n = vectors.len() as f64;
    let mean = vectors.iter().map(|v| field(v) as f64).sum::<f64>() / n;
    let variance = vectors
        .iter()
        .map(|v| {
            let deviation = field(v) as f64 - mean;
            deviation * deviation
        })
        .sum::<f64>()
        / n;

    (mean as f32, variance as f32)
}
