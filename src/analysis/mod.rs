// Analysis module - spectral analysis of raw audio frames
//
// `SpectralAnalyzer` owns per-call state (previous FFT frame, energy
// history), so every consumer goes through `SharedAnalyzer`, which serializes
// calls behind a mutex.

use std::sync::{Arc, Mutex, MutexGuard};

pub mod features;

pub use features::{Dynamics, FeatureVector, SpectralAnalyzer};

use crate::config::AnalyzerConfig;
use crate::error::{log_analyzer_error, AnalyzerError};

/// Cloneable handle to a mutex-guarded analyzer
#[derive(Clone)]
pub struct SharedAnalyzer {
    inner: Arc<Mutex<SpectralAnalyzer>>,
}

impl SharedAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self::from_analyzer(SpectralAnalyzer::new(config))
    }

    pub fn from_analyzer(analyzer: SpectralAnalyzer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(analyzer)),
        }
    }

    /// Analyze a raw PCM buffer; exactly one call runs at a time
    pub fn analyze(&self, raw_pcm: &[u8]) -> Result<FeatureVector, AnalyzerError> {
        let mut analyzer = self.lock()?;
        analyzer.analyze(raw_pcm).inspect_err(|err| {
            log_analyzer_error(err, "analyze");
        })
    }

    /// Analyze decoded samples
    pub fn analyze_samples(&self, samples: &[f32]) -> Result<FeatureVector, AnalyzerError> {
        Ok(self.lock()?.analyze_samples(samples))
    }

    pub fn reset(&self) -> Result<(), AnalyzerError> {
        self.lock()?.reset();
        Ok(())
    }

    pub fn spectrum_len(&self) -> Result<usize, AnalyzerError> {
        Ok(self.lock()?.spectrum_len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, SpectralAnalyzer>, AnalyzerError> {
        self.inner.lock().map_err(|_| AnalyzerError::LockPoisoned)
    }
}
