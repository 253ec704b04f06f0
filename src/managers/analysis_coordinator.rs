// AnalysisCoordinator: fan-in join of audio statistics and recognized text
//
// Single Responsibility: decide when a classification cycle is complete and
// run exactly one downstream call for it.
//
// Cycle:
// 1. Producers update their fields (last writer wins, errors clear)
// 2. The first update that completes the join while no call is in flight
//    builds the prompt and dispatches it on the blocking pool
// 3. The response is matched against the generation it was sent for; a
//    stale response is dropped
// 4. The join resets (new generation) and the report goes to the sink, the
//    raw response to the completion listener. Failures reset the join too.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::analysis::FeatureVector;
use crate::classification::{
    AnalysisResult, ClassificationReport, ClassificationService, PresentationSink, PromptBuilder,
};
use crate::error::{log_classifier_error, ClassifierError};
use crate::sampling::FeatureStats;
use crate::telemetry::{PipelineEvent, TelemetryCollector};

/// Called with the raw classifier response after the sink
pub type CompletionListener = Arc<dyn Fn(&str) + Send + Sync>;

struct JoinState {
    result: AnalysisResult,
    /// Generation of the call currently awaiting a response
    in_flight: Option<u64>,
}

struct CoordinatorShared {
    join: Mutex<JoinState>,
    service: Arc<dyn ClassificationService>,
    sink: Arc<dyn PresentationSink>,
    listener: Mutex<Option<CompletionListener>>,
    prompt: PromptBuilder,
    telemetry: Arc<TelemetryCollector>,
    /// One past the last closed generation: settled after its sink and
    /// listener returned, or abandoned by `reset()`
    settled: watch::Sender<u64>,
}

impl CoordinatorShared {
    // JoinState only holds owned values replaced wholesale; a poisoned lock
    // still guards a usable join.
    fn join(&self) -> MutexGuard<'_, JoinState> {
        self.join
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn listener(&self) -> Option<CompletionListener> {
        self.listener
            .lock()
            .map(|listener| listener.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Apply a classifier response to the cycle it was sent for
    fn settle(&self, generation: u64, response: Result<String, ClassifierError>) {
        {
            let mut join = self.join();
            if join.result.generation != generation {
                log::info!(
                    "[AnalysisCoordinator] Discarding stale response for generation {} (current {})",
                    generation,
                    join.result.generation
                );
                if join.in_flight == Some(generation) {
                    join.in_flight = None;
                }
                drop(join);
                self.telemetry
                    .publish(PipelineEvent::ClassificationDiscarded { generation });
                return;
            }

            join.result = AnalysisResult::new(generation + 1);
            join.in_flight = None;
        }

        match response {
            Ok(raw) => {
                let report = ClassificationReport::parse(&raw);
                log::info!(
                    "[AnalysisCoordinator] Generation {} classified as {} ({})",
                    generation,
                    report.emotion,
                    report.color
                );

                guarded("presentation sink", || self.sink.present(&report));
                if let Some(listener) = self.listener() {
                    guarded("completion listener", || listener(&raw));
                }
                self.telemetry
                    .publish(PipelineEvent::ClassificationDelivered { generation });
            }
            Err(err) => {
                log_classifier_error(&err, "classification_cycle");
                self.telemetry.publish(PipelineEvent::ClassificationFailed {
                    generation,
                    reason: err.to_string(),
                });
            }
        }
        self.close(generation);
    }

    fn close(&self, generation: u64) {
        self.settled.send_if_modified(|settled| {
            if *settled <= generation {
                *settled = generation + 1;
                true
            } else {
                false
            }
        });
    }
}

/// Fan-in coordinator
///
/// Cloning yields another handle to the same join.
#[derive(Clone)]
pub struct AnalysisCoordinator {
    shared: Arc<CoordinatorShared>,
}

impl AnalysisCoordinator {
    pub fn new(
        service: Arc<dyn ClassificationService>,
        sink: Arc<dyn PresentationSink>,
        prompt: PromptBuilder,
        telemetry: Arc<TelemetryCollector>,
    ) -> Self {
        Self {
            shared: Arc::new(CoordinatorShared {
                join: Mutex::new(JoinState {
                    result: AnalysisResult::new(0),
                    in_flight: None,
                }),
                service,
                sink,
                listener: Mutex::new(None),
                prompt,
                telemetry,
                settled: watch::channel(0).0,
            }),
        }
    }

    pub fn set_completion_listener<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let listener: CompletionListener = Arc::new(listener);
        match self.shared.listener.lock() {
            Ok(mut slot) => *slot = Some(listener),
            Err(poisoned) => *poisoned.into_inner() = Some(listener),
        }
    }

    pub fn on_audio_result(&self, stats: FeatureStats, features: Vec<FeatureVector>) {
        self.update("audio_result", |result| result.set_audio(stats, features));
    }

    pub fn on_audio_error(&self) {
        self.update("audio_error", AnalysisResult::clear_audio);
    }

    pub fn on_text_result(&self, text: impl Into<String>) {
        let text = text.into();
        self.update("text_result", |result| result.set_text(text));
    }

    pub fn on_text_error(&self) {
        self.update("text_error", AnalysisResult::clear_text);
    }

    /// Abandon the current cycle
    ///
    /// Clears all fields and starts a new generation; a response still in
    /// flight for the old generation will be discarded.
    pub fn reset(&self) {
        let mut join = self.shared.join();
        let generation = join.result.generation + 1;
        join.result = AnalysisResult::new(generation);
        join.in_flight = None;
        drop(join);
        self.shared.close(generation - 1);
        log::debug!("[AnalysisCoordinator] Reset to generation {}", generation);
    }

    /// Abandon `generation` unless it already moved on or its call is in
    /// flight; returns whether the join was reset
    pub fn abandon(&self, generation: u64) -> bool {
        let mut join = self.shared.join();
        if join.result.generation != generation || join.in_flight.is_some() {
            return false;
        }
        join.result = AnalysisResult::new(generation + 1);
        drop(join);
        self.shared.close(generation);
        log::debug!("[AnalysisCoordinator] Abandoned generation {}", generation);
        true
    }

    pub fn snapshot(&self) -> AnalysisResult {
        self.shared.join().result.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.shared.join().result.is_complete()
    }

    /// A classifier call is awaiting its response
    pub fn is_dispatching(&self) -> bool {
        self.shared.join().in_flight.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.shared.join().result.generation
    }

    /// Generations below this value are closed: delivered, failed or reset
    pub fn settled_generations(&self) -> u64 {
        *self.shared.settled.borrow()
    }

    /// Observe `settled_generations()`
    pub fn subscribe_settled(&self) -> watch::Receiver<u64> {
        self.shared.settled.subscribe()
    }

    fn update<F>(&self, source: &str, apply: F)
    where
        F: FnOnce(&mut AnalysisResult),
    {
        let dispatch = {
            let mut join = self.shared.join();
            apply(&mut join.result);
            tracing::debug!(
                source,
                generation = join.result.generation,
                complete = join.result.is_complete(),
                "[AnalysisCoordinator] join updated"
            );

            if join.in_flight.is_some() {
                None
            } else if let (Some(stats), Some(features), Some(text)) = (
                join.result.audio_stats.as_ref(),
                join.result.audio_features.as_ref(),
                join.result.recognized_text.as_ref(),
            ) {
                let prompt = self.shared.prompt.build(stats, features, text);
                let generation = join.result.generation;
                join.in_flight = Some(generation);
                Some((generation, prompt))
            } else {
                None
            }
        };

        if let Some((generation, prompt)) = dispatch {
            self.dispatch(generation, prompt);
        }
    }

    fn dispatch(&self, generation: u64, prompt: String) {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                self.shared.settle(
                    generation,
                    Err(ClassifierError::Unavailable {
                        reason: "no async runtime to run the classifier on".to_string(),
                    }),
                );
                return;
            }
        };

        log::info!(
            "[AnalysisCoordinator] Dispatching generation {} ({} byte prompt)",
            generation,
            prompt.len()
        );
        self.shared
            .telemetry
            .publish(PipelineEvent::ClassificationDispatched { generation });

        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            let service = Arc::clone(&shared.service);
            let response = tokio::task::spawn_blocking(move || service.send(&prompt))
                .await
                .unwrap_or_else(|err| {
                    Err(ClassifierError::Transport {
                        reason: format!("classifier call aborted: {}", err),
                    })
                });
            shared.settle(generation, response);
        });
    }
}

/// Run a host callback, containing any panic
fn guarded<F: FnOnce()>(label: &str, callback: F) {
    if std::panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
        log::error!("[AnalysisCoordinator] {} panicked", label);
    }
}
