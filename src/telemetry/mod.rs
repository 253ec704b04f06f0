//! Pipeline telemetry collector.
//!
//! The collector multiplexes session, task and classification events into a
//! bounded history plus an async broadcast stream. It is owned by whoever
//! builds the pipeline and shared through `Arc`; there is no global instance.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

pub mod events;

pub use events::{CompletionReason, PipelineEvent};

/// Snapshot of collector state for CLI reporting and tests.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<PipelineEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

impl TelemetrySnapshot {
    /// Number of retained events matching `predicate`
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&PipelineEvent) -> bool,
    {
        self.recent.iter().filter(|event| predicate(event)).count()
    }
}

/// Broadcast-based collector retaining a bounded history of events.
pub struct TelemetryCollector {
    tx: broadcast::Sender<PipelineEvent>,
    history: Mutex<VecDeque<PipelineEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        let history_capacity = history_capacity.max(1);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: PipelineEvent) {
        tracing::trace!(?event, "[Telemetry] publish");
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self.history();
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        // No subscribers is not an error
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Live event stream; events missed by a lagging consumer are skipped.
    pub fn stream(&self) -> impl Stream<Item = PipelineEvent> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(err) => {
                    log::warn!("[Telemetry] Stream lagged: {}", err);
                    None
                }
            }
        })
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.history();
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }

    // A poisoned history only means a publisher panicked mid-push; the
    // queue itself is still consistent.
    fn history(&self) -> MutexGuard<'_, VecDeque<PipelineEvent>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 256)
    }
}
