// SamplingSession - vectors collected during one bounded run
//
// Append-only and capped. A session ends when it holds `max_samples`
// vectors or when its deadline passes, whichever comes first.

use std::time::Duration;

use tokio::time::Instant;

use super::stats::FeatureStats;
use crate::analysis::FeatureVector;
use crate::config::SamplingConfig;

/// Why a session stopped collecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// `max_samples` vectors were collected
    SampleCap,
    /// The wall-clock deadline passed
    Deadline,
}

/// One bounded capture run
#[derive(Debug)]
pub struct SamplingSession {
    collected: Vec<FeatureVector>,
    max_samples: usize,
    started_at: Instant,
    deadline: Instant,
}

impl SamplingSession {
    /// Start a session now
    pub fn new(max_samples: usize, total_duration: Duration) -> Self {
        Self::starting_at(Instant::now(), max_samples, total_duration)
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self::new(config.max_samples, config.total_duration())
    }

    pub fn starting_at(started_at: Instant, max_samples: usize, total_duration: Duration) -> Self {
        Self {
            collected: Vec::with_capacity(max_samples),
            max_samples,
            started_at,
            deadline: started_at + total_duration,
        }
    }

    /// Append a vector
    ///
    /// Returns `false` (and drops the vector) once the cap is reached.
    pub fn push(&mut self, vector: FeatureVector) -> bool {
        if self.is_full() {
            return false;
        }
        self.collected.push(vector);
        true
    }

    pub fn is_full(&self) -> bool {
        self.collected.len() >= self.max_samples
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Termination check evaluated on every tick
    pub fn end_reason(&self, now: Instant) -> Option<SessionEnd> {
        if self.is_full() {
            Some(SessionEnd::SampleCap)
        } else if self.is_expired(now) {
            Some(SessionEnd::Deadline)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.collected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collected.is_empty()
    }

    pub fn collected(&self) -> &[FeatureVector] {
        &self.collected
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Consume the session into its vectors and their statistics
    pub fn finish(self) -> (Vec<FeatureVector>, FeatureStats) {
        let stats = FeatureStats::from_vectors(&self.collected);
        (self.collected, stats)
    }
}
