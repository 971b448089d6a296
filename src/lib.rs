//! Buffered, dimensioned metrics accumulator
//!
//! Record typed measurements against an [`Accumulator`], derive children
//! with extra [`Dimension`]s per component, and periodically flush the
//! buffer to a [`Backend`]: CloudWatch-style transmission, structured
//! logs, or a channel hand-off.
//!
//! # Example
//! ```
//! use metrics_accumulator::{Accumulator, Logging};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let metrics = Accumulator::new(Logging::new("MyApplication"));
//! let component = metrics.new_metrics(&[("Component", "frontend")]).unwrap();
//!
//! component.add_count("requests", 1.0).await;
//! component.submit_and_clear().await.unwrap();
//! # });
//! ```

/// Opaque error surfaced by backend clients
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub use {
    accumulator::{Accumulator, CLASS_NAME_DIMENSION},
    backend::{Backend, Channel, CloudWatch, CloudWatchClient, Logging, MetricDatum, MAX_DATA_PER_CALL},
    cache_stats::CacheStats,
    dimension::Dimension,
    error::MetricsError,
    metric::{Metric, MetricUnit, TimeUnit},
};

mod accumulator;
mod backend;
mod cache_stats;
mod dimension;
mod error;
mod metric;
#[cfg(test)]
mod test_support;
