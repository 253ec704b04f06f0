//! Pipeline event types published by the managers and exposed to the CLI
//! and tests through the telemetry collector.

use serde::{Deserialize, Serialize};

/// Why a bounded task left the Running state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// `complete()` was called from outside
    Signalled,
    /// The polled action reported success
    ActionSucceeded,
    /// The attempt cap was reached
    MaxAttempts,
    /// The timeout elapsed
    TimedOut,
    /// A one-shot action panicked
    Panicked,
}

/// Lifecycle events across sampling, retry tasks and classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PipelineEvent {
    SessionStarted {
        max_samples: usize,
        total_duration_ms: u64,
    },
    SampleCollected {
        count: usize,
    },
    SampleSkipped,
    SessionCompleted {
        sample_count: usize,
    },
    SessionStopped,
    SessionFailed {
        reason: String,
    },
    TaskStarted {
        task: String,
    },
    TaskCompleted {
        task: String,
        reason: CompletionReason,
        attempts: u32,
    },
    ClassificationDispatched {
        generation: u64,
    },
    ClassificationDelivered {
        generation: u64,
    },
    ClassificationDiscarded {
        generation: u64,
    },
    ClassificationFailed {
        generation: u64,
        reason: String,
    },
}
