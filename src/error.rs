//! # Error
//!
//! Error taxonomy for recording, derivation and flushing

use thiserror::Error;

use crate::dimension::Dimension;
use crate::metric::TimeUnit;
use crate::BoxError;

#[derive(Debug, Error)]
pub enum MetricsError {
    /// Derivation attempted to add a dimension name the accumulator
    /// already carries; no partial mutation has occurred
    #[error("attempting to add dimensions that already exist. current: {current:?}, new: {offending:?}")]
    DuplicateDimension {
        current: Vec<Dimension>,
        offending: Vec<Dimension>,
    },

    /// Only seconds and milliseconds map onto a metric unit
    #[error("unsupported time unit {0:?}")]
    UnsupportedTimeUnit(TimeUnit),

    /// The channel backend's receiver was dropped before the batch was accepted
    #[error("metrics channel closed before the batch was accepted")]
    ChannelClosed,

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// Transmission failure surfaced by a backend client; the buffer has
    /// already been cleared by the time this propagates
    #[error("backend transmission failed: {0}")]
    Backend(#[source] BoxError),
}
