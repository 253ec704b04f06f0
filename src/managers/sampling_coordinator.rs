// SamplingCoordinator: timed sampling sessions over the latest audio buffer
//
// Single Responsibility: own the latest-buffer mailbox and at most one
// sampling session. Each session is a tokio task ticking every
// `SamplingConfig::sample_interval()`; every tick analyzes whatever buffer
// the producer stored last.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};

use crate::analysis::{FeatureVector, SharedAnalyzer};
use crate::config::SamplingConfig;
use crate::error::{log_session_error, SessionError};
use crate::sampling::{FeatureStats, LatestBuffer, SamplingSession, SessionEnd};
use crate::telemetry::{PipelineEvent, TelemetryCollector};

/// Boxed session callbacks, each invoked at most once
pub struct SessionCallbacks {
    on_complete: Box<dyn FnOnce(Vec<FeatureVector>, FeatureStats) + Send>,
    on_error: Box<dyn FnOnce(SessionError) + Send>,
    on_cleanup: Box<dyn FnOnce() + Send>,
}

impl SessionCallbacks {
    pub fn new<C, E, K>(on_complete: C, on_error: E, on_cleanup: K) -> Self
    where
        C: FnOnce(Vec<FeatureVector>, FeatureStats) + Send + 'static,
        E: FnOnce(SessionError) + Send + 'static,
        K: FnOnce() + Send + 'static,
    {
        Self {
            on_complete: Box::new(on_complete),
            on_error: Box::new(on_error),
            on_cleanup: Box::new(on_cleanup),
        }
    }
}

struct ActiveSession {
    id: u64,
    cancel: oneshot::Sender<()>,
}

type ActiveSlot = Arc<Mutex<Option<ActiveSession>>>;

enum LoopExit {
    Finished(SessionEnd),
    Cancelled,
    Failed(SessionError),
}

/// Everything a session task needs, cloned out of the coordinator
struct SessionContext {
    id: u64,
    analyzer: SharedAnalyzer,
    mailbox: LatestBuffer,
    config: SamplingConfig,
    active: ActiveSlot,
    telemetry: Arc<TelemetryCollector>,
}

/// Manages the single active sampling session
///
/// # Example
/// ```ignore
/// let sampler = SamplingCoordinator::new(analyzer, SamplingConfig::default(), telemetry);
/// sampler.start(
///     |vectors, stats| println!("{} vectors", stats.sample_count),
///     |err| eprintln!("{}", err),
///     || println!("done"),
/// )?;
/// sampler.feed(pcm_bytes)?;
/// ```
#[derive(Clone)]
pub struct SamplingCoordinator {
    analyzer: SharedAnalyzer,
    mailbox: LatestBuffer,
    config: SamplingConfig,
    active: ActiveSlot,
    next_id: Arc<AtomicU64>,
    telemetry: Arc<TelemetryCollector>,
}

impl SamplingCoordinator {
    pub fn new(
        analyzer: SharedAnalyzer,
        config: SamplingConfig,
        telemetry: Arc<TelemetryCollector>,
    ) -> Self {
        Self {
            analyzer,
            mailbox: LatestBuffer::new(),
            config,
            active: Arc::new(Mutex::new(None)),
            next_id: Arc::new(AtomicU64::new(1)),
            telemetry,
        }
    }

    /// Start a sampling session
    ///
    /// Exactly one of `on_complete` / `on_error` runs when the session ends
    /// on its own; neither runs after `stop()`. `on_cleanup` always runs last.
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// - `AlreadyRunning` when a session is active
    /// - `LockPoisoned` / `Analyzer` when shared state is unusable
    pub fn start<C, E, K>(
        &self,
        on_complete: C,
        on_error: E,
        on_cleanup: K,
    ) -> Result<(), SessionError>
    where
        C: FnOnce(Vec<FeatureVector>, FeatureStats) + Send + 'static,
        E: FnOnce(SessionError) + Send + 'static,
        K: FnOnce() + Send + 'static,
    {
        self.start_with(SessionCallbacks::new(on_complete, on_error, on_cleanup))
    }

    pub fn start_with(&self, callbacks: SessionCallbacks) -> Result<(), SessionError> {
        let mut active = self.lock_active().inspect_err(|err| {
            log_session_error(err, "start_session");
        })?;

        if active.is_some() {
            let err = SessionError::AlreadyRunning;
            log_session_error(&err, "start_session");
            return Err(err);
        }

        self.analyzer.reset()?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        *active = Some(ActiveSession {
            id,
            cancel: cancel_tx,
        });
        drop(active);

        log::info!(
            "[SamplingCoordinator] Session {} started: {} samples over {} ms",
            id,
            self.config.max_samples,
            self.config.total_duration_ms
        );
        self.telemetry.publish(PipelineEvent::SessionStarted {
            max_samples: self.config.max_samples,
            total_duration_ms: self.config.total_duration_ms,
        });

        let ctx = SessionContext {
            id,
            analyzer: self.analyzer.clone(),
            mailbox: self.mailbox.clone(),
            config: self.config.clone(),
            active: Arc::clone(&self.active),
            telemetry: Arc::clone(&self.telemetry),
        };
        tokio::spawn(Self::run_session(ctx, cancel_rx, callbacks));
        Ok(())
    }

    /// Store the newest raw PCM buffer (lossy, last writer wins)
    pub fn feed(&self, raw_pcm: Vec<u8>) -> Result<(), SessionError> {
        self.mailbox.store(raw_pcm)
    }

    /// Cancel the active session
    ///
    /// Safe at any time; returns `Ok(false)` when nothing was running.
    /// `on_complete` is never invoked for a stopped session, `on_cleanup` is.
    pub fn stop(&self) -> Result<bool, SessionError> {
        let taken = self.lock_active()?.take();
        match taken {
            Some(session) => {
                log::info!("[SamplingCoordinator] Stopping session {}", session.id);
                // The task may already be exiting on its own
                let _ = session.cancel.send(());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_active()
            .map(|active| active.is_some())
            .unwrap_or(false)
    }

    pub fn mailbox(&self) -> &LatestBuffer {
        &self.mailbox
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    fn lock_active(&self) -> Result<MutexGuard<'_, Option<ActiveSession>>, SessionError> {
        lock_slot(&self.active)
    }

    async fn run_session(
        ctx: SessionContext,
        mut cancel: oneshot::Receiver<()>,
        callbacks: SessionCallbacks,
    ) {
        let mut session = SamplingSession::from_config(&ctx.config);
        let mut ticker = tokio::time::interval(ctx.config.sample_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            tokio::select! {
                biased;
                _ = &mut cancel => break LoopExit::Cancelled,
                _ = ticker.tick() => {}
            }

            if let Some(end) = session.end_reason(Instant::now()) {
                break LoopExit::Finished(end);
            }

            let tick = std::panic::catch_unwind(AssertUnwindSafe(|| {
                Self::sample_once(&ctx, &mut session)
            }));
            match tick {
                Ok(Ok(true)) => {
                    tracing::debug!(
                        session = ctx.id,
                        count = session.len(),
                        "[SamplingCoordinator] sample collected"
                    );
                    ctx.telemetry.publish(PipelineEvent::SampleCollected {
                        count: session.len(),
                    });
                }
                Ok(Ok(false)) => {
                    tracing::trace!(session = ctx.id, "[SamplingCoordinator] no buffer yet");
                    ctx.telemetry.publish(PipelineEvent::SampleSkipped);
                }
                Ok(Err(err)) => break LoopExit::Failed(err),
                Err(_) => {
                    log::error!("[SamplingCoordinator] Session {} tick panicked", ctx.id);
                    ctx.telemetry.publish(PipelineEvent::SampleSkipped);
                }
            }

            if let Some(end) = session.end_reason(Instant::now()) {
                break LoopExit::Finished(end);
            }
        };

        Self::conclude(&ctx, session, exit, callbacks);
    }

    /// Analyze the latest buffer; `Ok(false)` when nothing was fed yet
    fn sample_once(
        ctx: &SessionContext,
        session: &mut SamplingSession,
    ) -> Result<bool, SessionError> {
        let Some(buffer) = ctx.mailbox.latest()? else {
            return Ok(false);
        };
        let vector = ctx.analyzer.analyze(&buffer)?;
        Ok(session.push(vector))
    }

    fn conclude(
        ctx: &SessionContext,
        session: SamplingSession,
        exit: LoopExit,
        callbacks: SessionCallbacks,
    ) {
        let SessionCallbacks {
            on_complete,
            on_error,
            on_cleanup,
        } = callbacks;

        // A session that lost its slot was stopped, whatever the loop saw
        let exit = match exit {
            LoopExit::Cancelled => LoopExit::Cancelled,
            other if Self::release(ctx) => other,
            _ => LoopExit::Cancelled,
        };

        match exit {
            LoopExit::Finished(end) => {
                let (vectors, stats) = session.finish();
                log::info!(
                    "[SamplingCoordinator] Session {} complete ({:?}): {} samples over {:.0} ms",
                    ctx.id,
                    end,
                    stats.sample_count,
                    stats.duration_ms
                );
                ctx.telemetry.publish(PipelineEvent::SessionCompleted {
                    sample_count: stats.sample_count,
                });
                guarded("on_complete", || on_complete(vectors, stats));
            }
            LoopExit::Failed(err) => {
                log_session_error(&err, "sampling_tick");
                ctx.telemetry.publish(PipelineEvent::SessionFailed {
                    reason: err.to_string(),
                });
                guarded("on_error", || on_error(err));
            }
            LoopExit::Cancelled => {
                log::info!("[SamplingCoordinator] Session {} stopped", ctx.id);
                ctx.telemetry.publish(PipelineEvent::SessionStopped);
            }
        }

        guarded("on_cleanup", on_cleanup);
    }

    /// Give up the active slot if it still belongs to this session
    fn release(ctx: &SessionContext) -> bool {
        match lock_slot(&ctx.active) {
            Ok(mut active) => {
                if active.as_ref().map(|session| session.id) == Some(ctx.id) {
                    *active = None;
                    true
                } else {
                    false
                }
            }
            Err(err) => {
                log_session_error(&err, "release_session");
                false
            }
        }
    }
}

fn lock_slot(slot: &ActiveSlot) -> Result<MutexGuard<'_, Option<ActiveSession>>, SessionError> {
    slot.lock().map_err(|_| SessionError::LockPoisoned {
        component: "active_session".to_string(),
    })
}

/// Run a host callback, containing any panic at the task boundary
fn guarded<F: FnOnce()>(label: &str, callback: F) {
    if std::panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
        log::error!("[SamplingCoordinator] {} callback panicked", label);
    }
}
