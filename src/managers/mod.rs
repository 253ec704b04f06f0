// Managers Module
//
// Each manager owns one background concern and is shared through cheap
// `Clone` handles; none of them is global.
//
// - SamplingCoordinator: latest-buffer mailbox and timed sampling sessions
// - TaskCompletionManager / OneShotTask: bounded retry and run-once tasks
// - AnalysisCoordinator: audio/text fan-in and the single classifier call

pub mod analysis_coordinator;
pub mod sampling_coordinator;
pub mod task_completion_manager;

pub use analysis_coordinator::{AnalysisCoordinator, CompletionListener};
pub use sampling_coordinator::{SamplingCoordinator, SessionCallbacks};
pub use task_completion_manager::{CompletionHook, OneShotTask, TaskCompletionManager};
