// LatestBuffer - single-slot mailbox for raw audio
//
// Lossy: a new buffer replaces whatever is in the slot, consumed or not.
// The sampling loop reads the current state of the stream, never its history.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::SessionError;

/// Shared overwrite-latest cell holding the most recent raw PCM buffer
#[derive(Clone, Default)]
pub struct LatestBuffer {
    slot: Arc<Mutex<Option<Arc<Vec<u8>>>>>,
    writes: Arc<AtomicU64>,
}

impl LatestBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents (last writer wins)
    pub fn store(&self, bytes: Vec<u8>) -> Result<(), SessionError> {
        let mut slot = self.slot.lock().map_err(|_| SessionError::LockPoisoned {
            component: "latest_buffer".to_string(),
        })?;
        *slot = Some(Arc::new(bytes));
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Current buffer without consuming it
    ///
    /// The same buffer may be returned by consecutive reads when the producer
    /// has not written in between.
    pub fn latest(&self) -> Result<Option<Arc<Vec<u8>>>, SessionError> {
        let slot = self.slot.lock().map_err(|_| SessionError::LockPoisoned {
            component: "latest_buffer".to_string(),
        })?;
        Ok(slot.clone())
    }

    /// Total number of buffers ever stored
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Empty the slot; only the producer does this, sessions never do
    pub fn clear(&self) -> Result<(), SessionError> {
        let mut slot = self.slot.lock().map_err(|_| SessionError::LockPoisoned {
            component: "latest_buffer".to_string(),
        })?;
        *slot = None;
        Ok(())
    }
}
