//! # Channel backend
//!
//! Takes submission work off the recording path: each flush hands a
//! snapshot of the buffer to a channel consumed elsewhere, e.g. a task
//! that writes to files or batches further. Closing the channel is the
//! consumer's lifecycle concern, not this backend's.

use std::collections::HashSet;

use tokio::sync::mpsc;

use super::Backend;
use crate::dimension::Dimension;
use crate::error::MetricsError;
use crate::metric::Metric;

/// Backend that sends each flushed batch over an mpsc channel
///
/// The send is awaited while the accumulator's lock is held, so a full
/// channel delays the flush (and any concurrent recordings) until the
/// consumer catches up.
#[derive(Debug, Clone)]
pub struct Channel {
    sender: mpsc::Sender<Vec<Metric>>,
}

impl Channel {
    pub fn new(sender: mpsc::Sender<Vec<Metric>>) -> Self {
        Self { sender }
    }
}

impl Backend for Channel {
    async fn submit(&self, _dimensions: &HashSet<Dimension>, metrics: &[Metric]) -> Result<(), MetricsError> {
        self.sender
            .send(metrics.to_vec())
            .await
            .map_err(|_| MetricsError::ChannelClosed)
    }
}
