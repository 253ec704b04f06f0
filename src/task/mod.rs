// Task module - bounded retry state machine
//
// `TaskState` is the pure Idle/Running/Completed machine; the scheduler that
// ticks it lives in `managers::task_completion_manager`. Polled actions
// report a tri-state `PollOutcome` on every attempt.

mod state;

pub use state::{PollOutcome, TaskState};
