//! PipelineHandle: owned wiring of one audio feature pipeline.
//!
//! One classification cycle:
//! 1. `begin_cycle()` starts a sampling session and the cycle watchdog
//! 2. The host keeps calling `feed()` with raw PCM
//! 3. Session completion (or failure) is forwarded to the analysis
//!    coordinator; recognized text arrives through `submit_text()` or
//!    `recognize_text()`
//! 4. The coordinator sends one prompt, the sink receives the report
//!
//! The watchdog is a `TaskCompletionManager` bounding the wait for the
//! cycle's inputs: it succeeds once the classifier call is dispatched. If it
//! runs out of attempts or time first, the cycle is abandoned. A dispatched
//! call is never abandoned; the cycle stays active until its generation
//! settles (sink and listener returned).

use std::sync::Arc;

use tokio::sync::watch;

use crate::analysis::{FeatureVector, SharedAnalyzer};
use crate::classification::{ClassificationService, PresentationSink, PromptBuilder};
use crate::config::PipelineConfig;
use crate::error::{log_session_error, SessionError};
use crate::managers::{
    AnalysisCoordinator, OneShotTask, SamplingCoordinator, TaskCompletionManager,
};
use crate::sampling::FeatureStats;
use crate::task::PollOutcome;
use crate::telemetry::{CompletionReason, TelemetryCollector};

/// Task name reported in telemetry for the cycle watchdog
pub const CYCLE_TASK: &str = "classification_cycle";

/// Task name reported in telemetry for one-shot text recognition
pub const TEXT_TASK: &str = "text_recognition";

/// PipelineHandle orchestrates one pipeline instance.
pub struct PipelineHandle {
    config: PipelineConfig,
    analyzer: SharedAnalyzer,
    sampler: SamplingCoordinator,
    coordinator: AnalysisCoordinator,
    cycle: TaskCompletionManager,
    text_task: OneShotTask,
    /// Generation of the active cycle
    active: Arc<watch::Sender<Option<u64>>>,
    telemetry: Arc<TelemetryCollector>,
}

impl PipelineHandle {
    pub fn new(
        config: PipelineConfig,
        service: Arc<dyn ClassificationService>,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        let telemetry = Arc::new(TelemetryCollector::default());
        let analyzer = SharedAnalyzer::new(&config.analyzer);
        let sampler = SamplingCoordinator::new(
            analyzer.clone(),
            config.sampling.clone(),
            Arc::clone(&telemetry),
        );
        let coordinator = AnalysisCoordinator::new(
            service,
            sink,
            PromptBuilder::new(config.prompt.clone()),
            Arc::clone(&telemetry),
        );
        let cycle =
            TaskCompletionManager::new(CYCLE_TASK, config.task.clone(), Arc::clone(&telemetry));
        let text_task = OneShotTask::new(TEXT_TASK, Arc::clone(&telemetry));

        Self {
            config,
            analyzer,
            sampler,
            coordinator,
            cycle,
            text_task,
            active: Arc::new(watch::channel(None).0),
            telemetry,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn telemetry(&self) -> Arc<TelemetryCollector> {
        Arc::clone(&self.telemetry)
    }

    pub fn analyzer(&self) -> &SharedAnalyzer {
        &self.analyzer
    }

    pub fn sampler(&self) -> &SamplingCoordinator {
        &self.sampler
    }

    pub fn coordinator(&self) -> &AnalysisCoordinator {
        &self.coordinator
    }

    /// Store the newest raw PCM buffer
    pub fn feed(&self, raw_pcm: Vec<u8>) -> Result<(), SessionError> {
        self.sampler.feed(raw_pcm)
    }

    pub fn set_completion_listener<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.coordinator.set_completion_listener(listener);
    }

    /// Start one classification cycle
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// `AlreadyRunning` while the previous cycle has not finished.
    pub fn begin_cycle(&self) -> Result<(), SessionError> {
        let generation = self.coordinator.generation();
        let claimed = self.active.send_if_modified(|active| {
            if active.is_some() {
                false
            } else {
                *active = Some(generation);
                true
            }
        });
        if !claimed {
            let err = SessionError::AlreadyRunning;
            log_session_error(&err, "begin_cycle");
            return Err(err);
        }

        let on_complete = {
            let coordinator = self.coordinator.clone();
            move |vectors: Vec<FeatureVector>, stats: FeatureStats| {
                coordinator.on_audio_result(stats, vectors)
            }
        };
        let on_error = {
            let coordinator = self.coordinator.clone();
            move |_err: SessionError| coordinator.on_audio_error()
        };
        let on_cleanup = || log::debug!("[PipelineHandle] Sampling session cleaned up");
        if let Err(err) = self.sampler.start(on_complete, on_error, on_cleanup) {
            self.active.send_replace(None);
            return Err(err);
        }

        let watched = self.coordinator.clone();
        let sampler = self.sampler.clone();
        let abandoned = self.coordinator.clone();

        self.cycle.start_with_hook(
            move || {
                if watched.is_dispatching() || watched.settled_generations() > generation {
                    PollOutcome::Success
                } else {
                    PollOutcome::Pending
                }
            },
            move |reason| match reason {
                CompletionReason::MaxAttempts | CompletionReason::TimedOut => {
                    if abandoned.abandon(generation) {
                        log::warn!(
                            "[PipelineHandle] Cycle {} abandoned: {:?}",
                            generation,
                            reason
                        );
                        if let Err(err) = sampler.stop() {
                            log_session_error(&err, "abandon_cycle");
                        }
                    } else if abandoned.is_dispatching() {
                        log::info!(
                            "[PipelineHandle] Cycle {} watchdog expired with the classifier call in flight",
                            generation
                        );
                    }
                }
                _ => {}
            },
        );

        let mut settled = self.coordinator.subscribe_settled();
        let active = Arc::clone(&self.active);
        let cycle = self.cycle.clone();
        tokio::spawn(async move {
            // Err only once the coordinator is gone
            let _ = settled.wait_for(|closed| *closed > generation).await;
            end_cycle(&active, &cycle, generation);
        });

        log::info!("[PipelineHandle] Cycle {} started", generation);
        Ok(())
    }

    /// Deliver recognized text for the current cycle
    pub fn submit_text(&self, text: impl Into<String>) {
        self.coordinator.on_text_result(text);
    }

    /// Report that text recognition failed
    pub fn submit_text_error(&self) {
        self.coordinator.on_text_error();
    }

    /// Run a blocking text recognizer once and deliver its result
    ///
    /// `None` from the recognizer counts as a recognition error. Returns
    /// `false` when a recognition is already in flight.
    pub fn recognize_text<F>(&self, recognizer: F) -> bool
    where
        F: FnOnce() -> Option<String> + Send + 'static,
    {
        let coordinator = self.coordinator.clone();
        self.text_task
            .run(move || async move {
                match tokio::task::spawn_blocking(recognizer).await {
                    Ok(Some(text)) => coordinator.on_text_result(text),
                    Ok(None) => coordinator.on_text_error(),
                    Err(err) => {
                        log::error!("[PipelineHandle] Text recognizer failed: {}", err);
                        coordinator.on_text_error();
                    }
                }
            })
            .is_some()
    }

    /// Abandon the current cycle
    ///
    /// Stops sampling without reporting, clears the join (discarding any
    /// response still in flight) and ends the cycle. Safe when nothing is
    /// running.
    pub fn cancel_cycle(&self) -> Result<(), SessionError> {
        self.sampler.stop()?;
        let current = *self.active.borrow();
        self.coordinator.reset();
        if let Some(generation) = current {
            end_cycle(&self.active, &self.cycle, generation);
        }
        Ok(())
    }

    pub fn is_cycle_active(&self) -> bool {
        self.active.borrow().is_some()
    }

    /// Observe the generation of the active cycle (`None` when idle)
    pub fn subscribe_cycle(&self) -> watch::Receiver<Option<u64>> {
        self.active.subscribe()
    }
}

/// Stop the watchdog and clear the active cycle, if it is still `generation`
fn end_cycle(
    active: &watch::Sender<Option<u64>>,
    cycle: &TaskCompletionManager,
    generation: u64,
) {
    active.send_if_modified(|current| {
        if *current != Some(generation) {
            return false;
        }
        cycle.complete();
        *current = None;
        true
    });
}

// ========================================================================
// TEST HELPERS
// ========================================================================

#[cfg(test)]
mod tests;
