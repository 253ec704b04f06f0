// TaskCompletionManager: bounded retry scheduler for polled actions
//
// Single Responsibility: drive one `TaskState` machine from a tokio task.
// The action is invoked once per poll until it reports success, the attempt
// cap or timeout is reached, or `complete()` is called from outside.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::TaskConfig;
use crate::task::{PollOutcome, TaskState};
use crate::telemetry::{CompletionReason, PipelineEvent, TelemetryCollector};

/// Invoked once with the reason a run completed
pub type CompletionHook = Box<dyn FnOnce(CompletionReason) + Send>;

/// Current state plus the run it belongs to
///
/// `run` increases on every start so a loop from an earlier run can tell it
/// has been superseded.
struct TaskSlot {
    state: TaskState,
    run: u64,
    hook: Option<CompletionHook>,
}

/// A finished run whose hook still has to be called outside the lock
struct Finished {
    reason: CompletionReason,
    hook: Option<CompletionHook>,
}

impl Finished {
    fn notify(self) {
        if let Some(hook) = self.hook {
            let reason = self.reason;
            if std::panic::catch_unwind(AssertUnwindSafe(|| hook(reason))).is_err() {
                log::error!("[TaskCompletionManager] completion hook panicked");
            }
        }
    }
}

struct TaskShared {
    name: String,
    config: TaskConfig,
    slot: Mutex<TaskSlot>,
    in_progress: watch::Sender<bool>,
    wake: Notify,
    telemetry: Arc<TelemetryCollector>,
}

impl TaskShared {
    // TaskSlot is plain data; a panic while it was held cannot leave it
    // half-written.
    fn slot(&self) -> MutexGuard<'_, TaskSlot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move a running slot to Completed and announce it
    fn finish(&self, slot: &mut TaskSlot, reason: CompletionReason) -> Option<Finished> {
        let attempts = slot.state.attempts();
        if !slot.state.complete() {
            return None;
        }

        self.in_progress.send_replace(false);
        self.wake.notify_waiters();

        log::info!(
            "[TaskCompletionManager] {} completed after {} attempt(s): {:?}",
            self.name,
            attempts,
            reason
        );
        self.telemetry.publish(PipelineEvent::TaskCompleted {
            task: self.name.clone(),
            reason,
            attempts,
        });
        Some(Finished {
            reason,
            hook: slot.hook.take(),
        })
    }
}

/// Bounded retry scheduler
///
/// Cloning yields another handle to the same task.
///
/// # Example
/// ```ignore
/// let manager = TaskCompletionManager::new("ocr", TaskConfig::default(), telemetry);
/// manager.start(move || poll_ocr_result());
/// // ... later, when the result arrived through another path:
/// manager.complete();
/// ```
#[derive(Clone)]
pub struct TaskCompletionManager {
    shared: Arc<TaskShared>,
}

impl TaskCompletionManager {
    pub fn new(
        name: impl Into<String>,
        config: TaskConfig,
        telemetry: Arc<TelemetryCollector>,
    ) -> Self {
        let (in_progress, _) = watch::channel(false);
        Self {
            shared: Arc::new(TaskShared {
                name: name.into(),
                config,
                slot: Mutex::new(TaskSlot {
                    state: TaskState::Idle,
                    run: 0,
                    hook: None,
                }),
                in_progress,
                wake: Notify::new(),
                telemetry,
            }),
        }
    }

    /// Start polling `action`
    ///
    /// Ignored (returns `false`) while a run is in progress. Must be called
    /// from within a tokio runtime.
    pub fn start<F>(&self, action: F) -> bool
    where
        F: FnMut() -> PollOutcome + Send + 'static,
    {
        self.start_inner(action, None)
    }

    /// Like `start`, additionally calling `hook` once the run completes for
    /// any reason
    pub fn start_with_hook<F, H>(&self, action: F, hook: H) -> bool
    where
        F: FnMut() -> PollOutcome + Send + 'static,
        H: FnOnce(CompletionReason) + Send + 'static,
    {
        self.start_inner(action, Some(Box::new(hook)))
    }

    fn start_inner<F>(&self, action: F, hook: Option<CompletionHook>) -> bool
    where
        F: FnMut() -> PollOutcome + Send + 'static,
    {
        let run = {
            let mut slot = self.shared.slot();
            if !slot.state.start(Instant::now()) {
                log::debug!(
                    "[TaskCompletionManager] {} already running, start ignored",
                    self.shared.name
                );
                return false;
            }
            slot.run += 1;
            slot.hook = hook;
            slot.run
        };

        self.shared.in_progress.send_replace(true);
        self.shared.telemetry.publish(PipelineEvent::TaskStarted {
            task: self.shared.name.clone(),
        });

        let shared = Arc::clone(&self.shared);
        tokio::spawn(Self::poll_loop(shared, run, action));
        true
    }

    /// Force completion
    ///
    /// Idempotent; a no-op when nothing is running.
    pub fn complete(&self) -> bool {
        let finished = {
            let mut slot = self.shared.slot();
            self.shared.finish(&mut slot, CompletionReason::Signalled)
        };
        match finished {
            Some(finished) => {
                finished.notify();
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> TaskState {
        self.shared.slot().state
    }

    pub fn is_in_progress(&self) -> bool {
        *self.shared.in_progress.borrow()
    }

    /// Observe the in-progress flag
    pub fn subscribe_in_progress(&self) -> watch::Receiver<bool> {
        self.shared.in_progress.subscribe()
    }

    pub fn config(&self) -> &TaskConfig {
        &self.shared.config
    }

    async fn poll_loop<F>(shared: Arc<TaskShared>, run: u64, mut action: F)
    where
        F: FnMut() -> PollOutcome + Send + 'static,
    {
        loop {
            let finished = {
                let mut slot = shared.slot();
                if slot.run != run || !slot.state.is_running() {
                    return;
                }
                slot.state
                    .limit_reached(Instant::now(), &shared.config)
                    .and_then(|reason| shared.finish(&mut slot, reason))
            };
            if let Some(finished) = finished {
                finished.notify();
                return;
            }

            let outcome = std::panic::catch_unwind(AssertUnwindSafe(&mut action))
                .unwrap_or_else(|_| PollOutcome::failure("action panicked"));

            let finished = {
                let mut slot = shared.slot();
                if slot.run != run || !slot.state.is_running() {
                    return;
                }
                let attempt = slot.state.record_attempt();

                let reason = match outcome {
                    PollOutcome::Success => Some(CompletionReason::ActionSucceeded),
                    PollOutcome::Failure(reason) => {
                        log::warn!(
                            "[TaskCompletionManager] {} attempt {} failed: {}",
                            shared.name,
                            attempt,
                            reason
                        );
                        None
                    }
                    PollOutcome::Pending => None,
                };

                reason
                    .or_else(|| slot.state.limit_reached(Instant::now(), &shared.config))
                    .and_then(|reason| shared.finish(&mut slot, reason))
            };
            if let Some(finished) = finished {
                finished.notify();
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(shared.config.poll_interval()) => {}
                _ = shared.wake.notified() => {}
            }
        }
    }
}

/// Runs an async action exactly once, tracking only whether it is in flight
#[derive(Clone)]
pub struct OneShotTask {
    name: Arc<str>,
    in_progress: Arc<watch::Sender<bool>>,
    telemetry: Arc<TelemetryCollector>,
}

impl OneShotTask {
    pub fn new(name: impl Into<String>, telemetry: Arc<TelemetryCollector>) -> Self {
        let (in_progress, _) = watch::channel(false);
        Self {
            name: Arc::from(name.into()),
            in_progress: Arc::new(in_progress),
            telemetry,
        }
    }

    /// Spawn `action` unless a previous run is still in flight
    pub fn run<F, Fut>(&self, action: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let claimed = self.in_progress.send_if_modified(|running| {
            if *running {
                false
            } else {
                *running = true;
                true
            }
        });
        if !claimed {
            log::debug!("[OneShotTask] {} already in progress", self.name);
            return None;
        }

        self.telemetry.publish(PipelineEvent::TaskStarted {
            task: self.name.to_string(),
        });

        let future = action();
        let name = Arc::clone(&self.name);
        let in_progress = Arc::clone(&self.in_progress);
        let telemetry = Arc::clone(&self.telemetry);

        Some(tokio::spawn(async move {
            let reason = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) => CompletionReason::ActionSucceeded,
                Err(_) => {
                    log::error!("[OneShotTask] {} panicked", name);
                    CompletionReason::Panicked
                }
            };
            in_progress.send_replace(false);
            telemetry.publish(PipelineEvent::TaskCompleted {
                task: name.to_string(),
                reason,
                attempts: 1,
            });
        }))
    }

    pub fn is_in_progress(&self) -> bool {
        *self.in_progress.borrow()
    }

    pub fn subscribe_in_progress(&self) -> watch::Receiver<bool> {
        self.in_progress.subscribe()
    }
}
