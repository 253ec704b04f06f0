// Audio Feature Pipeline
//
// Spectral analysis of live PCM, bounded sampling sessions reduced to summary
// statistics, and a fan-in coordinator that joins those statistics with
// recognized text to trigger one downstream classification per cycle.

pub mod analysis;
pub mod classification;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod managers;
pub mod sampling;
pub mod task;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::{Dynamics, FeatureVector, SharedAnalyzer, SpectralAnalyzer};
pub use classification::{
    AnalysisResult, ClassificationReport, ClassificationService, PresentationSink,
};
pub use config::PipelineConfig;
pub use engine::PipelineHandle;
pub use error::{AnalyzerError, ClassifierError, ConfigError, ErrorCode, SessionError};
pub use managers::{AnalysisCoordinator, OneShotTask, SamplingCoordinator, TaskCompletionManager};
pub use sampling::FeatureStats;
pub use task::{PollOutcome, TaskState};
