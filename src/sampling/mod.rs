// Sampling module - bounded capture sessions and their reduction
//
// This module provides the data side of a sampling run:
// 1. LatestBuffer: single-slot, overwrite-latest mailbox fed by the capture host
// 2. SamplingSession: the vectors collected during one bounded run
// 3. FeatureStats: population statistics over a finished session
//
// The timed loop that drives a session lives in
// `managers::SamplingCoordinator`.

pub mod mailbox;
pub mod session;
pub mod stats;

pub use mailbox::LatestBuffer;
pub use session::{SamplingSession, SessionEnd};
pub use stats::FeatureStats;
