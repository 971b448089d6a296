//! Backend that captures submitted batches for assertions

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::Backend;
use crate::dimension::Dimension;
use crate::error::MetricsError;
use crate::metric::Metric;

#[derive(Clone, Debug, Default)]
pub(crate) struct RecordingBackend {
    batches: Arc<Mutex<Vec<(Vec<Dimension>, Vec<Metric>)>>>,
    fail_next: Arc<AtomicBool>,
}

impl RecordingBackend {
    pub(crate) fn batches(&self) -> Vec<(Vec<Dimension>, Vec<Metric>)> {
        self.batches.lock().unwrap().clone()
    }

    /// Makes the next submit fail with a backend error
    pub(crate) fn fail_next_submit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl Backend for RecordingBackend {
    async fn submit(&self, dimensions: &HashSet<Dimension>, metrics: &[Metric]) -> Result<(), MetricsError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(MetricsError::Backend("transmission refused".into()));
        }
        let mut dimensions: Vec<Dimension> = dimensions.iter().cloned().collect();
        dimensions.sort_by(|a, b| a.name.cmp(&b.name));
        self.batches.lock().unwrap().push((dimensions, metrics.to_vec()));
        Ok(())
    }
}
