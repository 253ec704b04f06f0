// PromptBuilder - deterministic classifier prompt
//
// Same inputs always produce the same text: numeric series use a fixed
// precision and nothing time-dependent is included. The silence heuristic
// only swaps the guidance paragraph; the response contract never changes.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::analysis::{Dynamics, FeatureVector};
use crate::config::PromptConfig;
use crate::sampling::FeatureStats;

/// JSON shape every response is asked to follow
pub const RESPONSE_CONTRACT: &str = r##"{"emotion": "<one lowercase word>", "color": "#RRGGBB", "description": "<one sentence>"}"##;

const DOMINANT_NOTES: usize = 3;

const GUIDANCE_NORMAL: &str = "Weigh the audio character (energy, pitch movement, brightness, \
beats) together with the meaning of the recognized text.";

const GUIDANCE_SILENCE: &str = "The audio is very likely silence or background noise. Do not read \
emotion into the audio measurements; base the classification on the recognized text alone.";

const GUIDANCE_NO_AUDIO: &str = "No audio frames were captured. Base the classification on the \
recognized text alone.";

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    /// Both mean energy and mean loudness sit below the silence thresholds
    pub fn is_likely_silence(&self, stats: &FeatureStats) -> bool {
        stats.energy_mean < self.config.silence_energy_threshold
            && stats.loudness_mean_db < self.config.silence_loudness_db
    }

    pub fn build(&self, stats: &FeatureStats, features: &[FeatureVector], text: &str) -> String {
        let p = self.config.series_precision;
        let mut prompt = String::new();

        // Writing to a String cannot fail
        let _ = writeln!(
            prompt,
            "You are given measurements of a short audio recording and the text that was \
             recognized at the same moment. Classify the overall emotion of the moment."
        );
        let _ = writeln!(prompt);

        let _ = writeln!(prompt, "Audio summary:");
        let _ = writeln!(prompt, "- duration_ms: {:.0}", stats.duration_ms);
        let _ = writeln!(prompt, "- samples: {}", stats.sample_count);
        let _ = writeln!(
            prompt,
            "- energy: mean {:.p$} variance {:.p$}",
            stats.energy_mean, stats.energy_variance
        );
        let _ = writeln!(
            prompt,
            "- pitch_hz: mean {:.p$} variance {:.p$}",
            stats.pitch_mean, stats.pitch_variance
        );
        let _ = writeln!(
            prompt,
            "- brightness: mean {:.p$} variance {:.p$}",
            stats.brightness_mean, stats.brightness_variance
        );
        let _ = writeln!(prompt, "- loudness_db: mean {:.p$}", stats.loudness_mean_db);
        let _ = writeln!(
            prompt,
            "- dynamics: {}",
            Dynamics::from_energy(stats.energy_mean)
        );
        let _ = writeln!(
            prompt,
            "- beats: {}",
            features.iter().filter(|v| v.is_beat).count()
        );
        let _ = writeln!(prompt, "- dominant_notes: {}", dominant_notes(features));
        let _ = writeln!(prompt);

        let _ = writeln!(prompt, "Series (one value per sample):");
        let _ = writeln!(
            prompt,
            "- energy: {}",
            format_series(features.iter().map(|v| v.energy), p)
        );
        let _ = writeln!(
            prompt,
            "- pitch_hz: {}",
            format_series(features.iter().map(|v| v.pitch()), p)
        );
        let _ = writeln!(
            prompt,
            "- brightness: {}",
            format_series(features.iter().map(|v| v.brightness), p)
        );
        let _ = writeln!(
            prompt,
            "- centroid: {}",
            format_series(features.iter().map(|v| v.spectral_centroid), p)
        );
        let _ = writeln!(
            prompt,
            "- harmonic_complexity: {}",
            format_series(features.iter().map(|v| v.harmonic_complexity), p)
        );
        let _ = writeln!(prompt);

        let _ = writeln!(prompt, "Recognized text:");
        if text.trim().is_empty() {
            let _ = writeln!(prompt, "(none)");
        } else {
            let _ = writeln!(prompt, "\"\"\"\n{}\n\"\"\"", text.trim());
        }
        let _ = writeln!(prompt);

        let guidance = if stats.sample_count == 0 {
            GUIDANCE_NO_AUDIO
        } else if self.is_likely_silence(stats) {
            GUIDANCE_SILENCE
        } else {
            GUIDANCE_NORMAL
        };
        let _ = writeln!(prompt, "Guidance: {}", guidance);
        let _ = write!(
            prompt,
            "Respond with a single JSON object and nothing else: {}",
            RESPONSE_CONTRACT
        );

        prompt
    }
}

/// `[a, b, c]` with a fixed number of decimals
fn format_series<I>(values: I, precision: usize) -> String
where
    I: Iterator<Item = f32>,
{
    let items: Vec<String> = values
        .map(|v| format!("{:.*}", precision, if v.is_finite() { v } else { 0.0 }))
        .collect();
    format!("[{}]", items.join(", "))
}

/// Most frequent note names, ties broken alphabetically
fn dominant_notes(features: &[FeatureVector]) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for vector in features.iter().filter(|v| !v.is_silent()) {
        *counts.entry(vector.pitch_name()).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return "none".to_string();
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    // Stable sort keeps the BTreeMap's alphabetical order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(DOMINANT_NOTES)
        .map(|(name, count)| format!("{} ({})", name, count))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SpectralAnalyzer;
    use crate::analysis::features::encode_pcm16_le;

    fn tone_vectors(count: usize, amplitude: f32) -> Vec<FeatureVector> {
        let mut analyzer = SpectralAnalyzer::new_default();
        let samples: Vec<f32> = (0..2048)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
            .collect();
        let pcm = encode_pcm16_le(&samples);
        (0..count).map(|_| analyzer.analyze(&pcm).unwrap()).collect()
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let vectors = tone_vectors(4, 0.5);
        let stats = FeatureStats::from_vectors(&vectors);
        let builder = PromptBuilder::default();

        let first = builder.build(&stats, &vectors, "hello");
        let second = builder.build(&stats, &vectors, "hello");
        assert_eq!(first, second);
        assert!(first.contains("- samples: 4"));
        assert!(first.contains("A4 (4)"));
        assert!(first.contains("\"\"\"\nhello\n\"\"\""));
        assert!(first.ends_with(RESPONSE_CONTRACT));
        assert!(first.contains(GUIDANCE_NORMAL));
    }

    #[test]
    fn test_fixed_precision_series() {
        assert_eq!(
            format_series([0.5_f32, 1.0 / 3.0].into_iter(), 3),
            "[0.500, 0.333]"
        );
        assert_eq!(format_series(std::iter::empty(), 3), "[]");
        assert_eq!(
            format_series([f32::NEG_INFINITY].into_iter(), 2),
            "[0.00]"
        );
    }

    #[test]
    fn test_silence_changes_guidance_only() {
        let builder = PromptBuilder::default();
        let quiet = tone_vectors(3, 0.0);
        let stats = FeatureStats::from_vectors(&quiet);
        assert!(builder.is_likely_silence(&stats));

        let prompt = builder.build(&stats, &quiet, "");
        assert!(prompt.contains(GUIDANCE_SILENCE));
        assert!(prompt.contains("(none)"));
        assert!(prompt.contains("dominant_notes: none"));
        assert!(prompt.ends_with(RESPONSE_CONTRACT));
    }

    #[test]
    fn test_loud_audio_not_silence() {
        let builder = PromptBuilder::default();
        let stats = FeatureStats::from_vectors(&tone_vectors(2, 0.8));
        assert!(!builder.is_likely_silence(&stats));
    }

    #[test]
    fn test_empty_session_uses_text_only_guidance() {
        let builder = PromptBuilder::default();
        let prompt = builder.build(&FeatureStats::default(), &[], "fine");
        assert!(prompt.contains(GUIDANCE_NO_AUDIO));
        assert!(prompt.contains("- energy: []"));
    }
}
