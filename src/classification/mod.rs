// Classification - fan-in data, prompt construction and the external seams
//
// Module organization:
// - result: AnalysisResult, the three-field join snapshot
// - prompt: deterministic prompt text from audio stats, vectors and text
// - report: parsed classifier response plus the emotion→color table
// - service: ClassificationService / PresentationSink traits and the
//   command-backed and dry-run services
//
// The coordinator driving a cycle lives in `managers::AnalysisCoordinator`.

pub mod prompt;
pub mod report;
pub mod result;
pub mod service;

pub use prompt::PromptBuilder;
pub use report::{color_for_emotion, ClassificationReport};
pub use result::AnalysisResult;
pub use service::{ClassificationService, CommandClassifier, DryRunClassifier, PresentationSink};
