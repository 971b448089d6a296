//! # Backend
//!
//! Delivery seam between the accumulator and wherever metrics go

use std::collections::HashSet;
use std::future::Future;

use crate::dimension::Dimension;
use crate::error::MetricsError;
use crate::metric::Metric;

mod channel;
mod cloudwatch;
mod logging;

pub use channel::Channel;
pub use cloudwatch::{CloudWatch, CloudWatchClient, MetricDatum, MAX_DATA_PER_CALL};
pub use logging::Logging;

/// Delivers a batch of buffered metrics to its destination
///
/// Derivation shares the backend between parent and child accumulators by
/// cloning it; implementations are cheap handles around their underlying
/// client or channel.
///
/// `submit` runs while the owning accumulator's lock is held: it must not
/// record onto the same accumulator (that would deadlock) and should avoid
/// unbounded blocking, since every concurrent recording waits on it.
pub trait Backend: Clone + Send + Sync {
    fn submit(
        &self,
        dimensions: &HashSet<Dimension>,
        metrics: &[Metric],
    ) -> impl Future<Output = Result<(), MetricsError>> + Send;
}
