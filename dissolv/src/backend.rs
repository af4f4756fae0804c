//! Modeling Backend Seam
//!
//! A backend consumes a finished `PlacementBatch` and turns it into solids.
//! Adapters for concrete CAD kernels implement `ModelingBackend`; the
//! library itself only ships `RecordingBackend`, which keeps what it was
//! given.

use thiserror::Error;

use crate::requests::PlacementBatch;

/// Errors reported by backend adapters
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend rejected request {name}: {reason}")]
    Rejected { name: String, reason: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Trait for solid-modeling backends
pub trait ModelingBackend {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Apply every request of a batch.
    fn apply(&mut self, batch: &PlacementBatch) -> Result<(), BackendError>;
}

/// Backend that records applied batches without building anything
#[derive(Debug, Default)]
pub struct RecordingBackend {
    batches: Vec<PlacementBatch>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[PlacementBatch] {
        &self.batches
    }

    pub fn last(&self) -> Option<&PlacementBatch> {
        self.batches.last()
    }

    pub fn into_batches(self) -> Vec<PlacementBatch> {
        self.batches
    }
}

impl ModelingBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn apply(&mut self, batch: &PlacementBatch) -> Result<(), BackendError> {
        tracing::debug!("Recording batch with {} requests", batch.request_count());
        self.batches.push(batch.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_backend_keeps_batches() {
        let mut backend = RecordingBackend::new();
        assert_eq!(backend.name(), "recording");
        assert!(backend.last().is_none());

        backend.apply(&PlacementBatch::default()).unwrap();
        backend.apply(&PlacementBatch::default()).unwrap();
        assert_eq!(backend.batches().len(), 2);
        assert_eq!(backend.into_batches().len(), 2);
    }
}
