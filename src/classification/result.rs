// AnalysisResult - fan-in snapshot of audio and text producers

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::analysis::FeatureVector;
use crate::sampling::FeatureStats;

/// Latest value from each producer within one cycle
///
/// Each field is last-writer-wins; a producer error leaves its field absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub audio_stats: Option<FeatureStats>,
    pub audio_features: Option<Vec<FeatureVector>>,
    pub recognized_text: Option<String>,
    /// Wall-clock time of the last update, ms since the Unix epoch
    pub timestamp_ms: u64,
    /// Cycle this snapshot belongs to
    pub generation: u64,
}

impl AnalysisResult {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            timestamp_ms: now_timestamp_ms(),
            ..Self::default()
        }
    }

    /// All three producer fields are present
    pub fn is_complete(&self) -> bool {
        self.audio_stats.is_some() && self.audio_features.is_some() && self.recognized_text.is_some()
    }

    pub fn set_audio(&mut self, stats: FeatureStats, features: Vec<FeatureVector>) {
        self.audio_stats = Some(stats);
        self.audio_features = Some(features);
        self.touch();
    }

    pub fn clear_audio(&mut self) {
        self.audio_stats = None;
        self.audio_features = None;
        self.touch();
    }

    pub fn set_text(&mut self, text: String) {
        self.recognized_text = Some(text);
        self.touch();
    }

    pub fn clear_text(&mut self) {
        self.recognized_text = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.timestamp_ms = now_timestamp_ms();
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
