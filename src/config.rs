//! Configuration for the audio feature pipeline
//!
//! Every constant the pipeline runs with lives here with its production
//! default. Hosts may load overrides from a JSON file; a missing or broken
//! file falls back to defaults so the pipeline always starts.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub analyzer: AnalyzerConfig,
    pub sampling: SamplingConfig,
    pub task: TaskConfig,
    pub prompt: PromptConfig,
}

/// Spectral analyzer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Samples per analysis frame (must be a power of two)
    pub frame_size: usize,
    /// Capture sample rate in Hz; all Hz-denominated features assume it
    pub sample_rate: u32,
    /// Bins below this frequency are ignored for fundamental detection
    pub min_frequency_hz: f32,
    /// Cumulative energy fraction defining spectral rolloff
    pub rolloff_threshold: f32,
    /// Energy above this frequency counts towards brightness
    pub brightness_cutoff_hz: f32,
    /// Frames of energy history kept for beat detection
    pub energy_history_len: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            sample_rate: 44_100,
            min_frequency_hz: 20.0,
            rolloff_threshold: 0.85,
            brightness_cutoff_hz: 1500.0,
            energy_history_len: 43,
        }
    }
}

/// Sampling session bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Maximum feature vectors collected per session
    pub max_samples: usize,
    /// Wall-clock length of one session
    pub total_duration_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_samples: 50,
            total_duration_ms: 5000,
        }
    }
}

impl SamplingConfig {
    /// Tick period: the session duration spread evenly over the sample cap
    pub fn sample_interval(&self) -> Duration {
        let samples = self.max_samples.max(1) as u64;
        Duration::from_millis((self.total_duration_ms / samples).max(1))
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.total_duration_ms)
    }
}

/// Retry/timeout bounds for `TaskCompletionManager`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub poll_ms: u64,
    pub timeout_ms: u64,
    pub max_attempts: u32,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            poll_ms: 200,
            timeout_ms: 15_000,
            max_attempts: 50,
        }
    }
}

impl TaskConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Prompt construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Mean energy below which audio is suspected silent
    pub silence_energy_threshold: f32,
    /// Mean loudness (dB) below which audio is suspected silent
    pub silence_loudness_db: f32,
    /// Decimal places for numeric series in the prompt
    pub series_precision: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            silence_energy_threshold: 0.001,
            silence_loudness_db: -60.0,
            series_precision: 3,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from JSON file
    ///
    /// Never fails: unreadable or unparsable files are logged and replaced by
    /// the default configuration.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from_file(&path) {
            Ok(config) => {
                log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                config
            }
            Err(err) => {
                log::warn!(
                    "[Config] Failed to load {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load and validate configuration, surfacing every failure
    pub fn try_load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let frame_size = self.analyzer.frame_size;
        if frame_size < 64 || !frame_size.is_power_of_two() {
            return Err(ConfigError::Invalid {
                field: "analyzer.frame_size",
                reason: format!("{} is not a power of two >= 64", frame_size),
            });
        }
        if self.analyzer.sample_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "analyzer.sample_rate",
                reason: "must be greater than 0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.analyzer.rolloff_threshold) {
            return Err(ConfigError::Invalid {
                field: "analyzer.rolloff_threshold",
                reason: format!("{} outside [0, 1]", self.analyzer.rolloff_threshold),
            });
        }
        if self.sampling.max_samples == 0 {
            return Err(ConfigError::Invalid {
                field: "sampling.max_samples",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.sampling.total_duration_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "sampling.total_duration_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.task.max_attempts == 0 || self.task.poll_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "task",
                reason: "poll_ms and max_attempts must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
