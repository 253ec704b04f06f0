// TaskState - Idle/Running/Completed transitions
//
// Transitions:
// - Idle | Completed -> Running on start (ignored when already Running)
// - Running -> Completed on explicit signal, action success, attempt cap or
//   timeout
// - Completed stays terminal until the next start

use std::time::Duration;

use tokio::time::Instant;

use crate::config::TaskConfig;
use crate::telemetry::CompletionReason;

/// Result of one invocation of a polled action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Not done yet; poll again
    Pending,
    /// The action finished on its own
    Success,
    /// This attempt failed; logged and retried
    Failure(String),
}

impl PollOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        PollOutcome::Failure(reason.into())
    }
}

/// State of one bounded task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Idle,
    Running {
        attempts: u32,
        started_at: Instant,
    },
    Completed,
}

impl TaskState {
    /// Enter Running; returns `false` when already running
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        *self = TaskState::Running {
            attempts: 0,
            started_at: now,
        };
        true
    }

    /// Count one attempt; returns the new attempt count (0 when not running)
    pub fn record_attempt(&mut self) -> u32 {
        match self {
            TaskState::Running { attempts, .. } => {
                *attempts += 1;
                *attempts
            }
            _ => 0,
        }
    }

    /// Attempt cap or timeout check for a running task
    pub fn limit_reached(&self, now: Instant, config: &TaskConfig) -> Option<CompletionReason> {
        match *self {
            TaskState::Running {
                attempts,
                started_at,
            } => {
                if attempts >= config.max_attempts {
                    Some(CompletionReason::MaxAttempts)
                } else if now.saturating_duration_since(started_at) >= config.timeout() {
                    Some(CompletionReason::TimedOut)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Enter Completed; returns `false` (no-op) unless running
    pub fn complete(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        *self = TaskState::Completed;
        true
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TaskState::Running { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            TaskState::Running { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self {
            TaskState::Running { started_at, .. } => now.saturating_duration_since(*started_at),
            _ => Duration::ZERO,
        }
    }
}
