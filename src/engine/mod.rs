//! Engine module housing the pipeline orchestration layer.
//!
//! `PipelineHandle` owns and wires the analyzer, the sampling and analysis
//! coordinators, the cycle watchdog and telemetry. CLI and host entry points
//! go through it.

pub mod core;

pub use self::core::PipelineHandle;
