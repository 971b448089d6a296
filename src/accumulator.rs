//! # Accumulator
//!
//! The in-memory buffer of pending metrics plus its fixed dimension set

use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::warn;

use crate::backend::Backend;
use crate::dimension::Dimension;
use crate::error::MetricsError;
use crate::metric::{Metric, MetricUnit, TimeUnit};

/// Dimension name used by [`Accumulator::new_metrics_for_type`]
pub const CLASS_NAME_DIMENSION: &str = "ClassName";

/// Buffered, dimensioned metrics accumulator
///
/// You should have one of these per service and use
/// [`Accumulator::new_metrics`] or similar to derive children with
/// additional dimensions for individual components.
///
/// An accumulator is safe to share between tasks. A single lock
/// serializes the buffer:
/// 1. only one metric may be appended at a time
/// 2. flushing blocks the appending of new metrics for its full duration
///
/// That second point is the deliberate trade-off of this design: no metric
/// recorded before a flush begins is dropped by that flush, and no metric
/// lands in a buffer the flush is concurrently reading. Recordings that
/// arrive mid-flush simply wait.
///
/// Dimensions are fixed at construction and never mutated afterwards.
#[derive(Debug)]
pub struct Accumulator<B> {
    dimensions: HashSet<Dimension>,
    buffer: tokio::sync::Mutex<Vec<Metric>>,
    backend: B,
}

impl<B: Backend> Accumulator<B> {
    pub fn new(backend: B) -> Self {
        Self::with_dimensions(backend, [])
    }

    pub fn with_dimensions(backend: B, dimensions: impl IntoIterator<Item = Dimension>) -> Self {
        Self {
            dimensions: dimensions.into_iter().collect(),
            buffer: tokio::sync::Mutex::new(Vec::new()),
            backend,
        }
    }

    pub fn dimensions(&self) -> &HashSet<Dimension> {
        &self.dimensions
    }

    /// Adds a count type metric
    pub async fn add_count(&self, name: impl Into<String>, value: f64) {
        self.add_metric(Metric::new(name, value, MetricUnit::Count)).await;
    }

    /// Adds a percentage type metric
    pub async fn add_percentage(&self, name: impl Into<String>, value: f64) {
        self.add_metric(Metric::new(name, value, MetricUnit::Percent)).await;
    }

    /// Adds a time type metric, truncated to milliseconds
    pub async fn add_time(&self, name: impl Into<String>, duration: Duration) {
        self.add_metric(Metric::new(
            name,
            TimeUnit::Milliseconds.truncate(duration),
            MetricUnit::Milliseconds,
        ))
        .await;
    }

    /// Adds a time type metric in an explicit unit
    ///
    /// Accepts seconds and milliseconds; anything finer is an
    /// [`MetricsError::UnsupportedTimeUnit`].
    pub async fn add_time_with_unit(
        &self,
        name: impl Into<String>,
        duration: Duration,
        unit: TimeUnit,
    ) -> Result<(), MetricsError> {
        let metric_unit = unit.to_metric_unit()?;
        self.add_metric(Metric::new(name, unit.truncate(duration), metric_unit))
            .await;
        Ok(())
    }

    /// Appends a metric to the buffer
    ///
    /// No deduplication: two metrics with the same name both appear and
    /// are expected to be aggregated by the backend or its consumer.
    pub async fn add_metric(&self, metric: Metric) {
        self.buffer.lock().await.push(metric);
    }

    /// Appends a batch of metrics under one lock acquisition
    pub async fn add_metrics(&self, metrics: impl IntoIterator<Item = Metric>) {
        self.buffer.lock().await.extend(metrics);
    }

    /// Runs `block`, records its wall-clock time on success and returns
    /// its value
    ///
    /// A failing block propagates its error without recording anything;
    /// an operation is either timed whole or not timed at all.
    pub async fn time_operation<F, Fut, T, E>(&self, name: &str, block: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let value = block().await?;
        self.add_time(name, started.elapsed()).await;
        Ok(value)
    }

    /// Derives a child accumulator carrying this instance's dimensions
    /// plus the supplied ones, sharing the backend
    ///
    /// Fails with [`MetricsError::DuplicateDimension`] if any supplied
    /// name collides with an existing dimension; nothing is mutated in
    /// that case.
    pub fn new_metrics(&self, dimensions: &[(&str, &str)]) -> Result<Self, MetricsError> {
        let candidates: Vec<Dimension> = dimensions
            .iter()
            .map(|(name, value)| Dimension::new(*name, *value))
            .collect();

        if candidates.iter().any(|candidate| self.dimensions.contains(candidate)) {
            return Err(MetricsError::DuplicateDimension {
                current: self.dimensions.iter().cloned().collect(),
                offending: candidates,
            });
        }

        let mut union = self.dimensions.clone();
        union.extend(candidates);

        Ok(Self {
            dimensions: union,
            buffer: tokio::sync::Mutex::new(Vec::new()),
            backend: self.backend.clone(),
        })
    }

    /// Derives a child with a `ClassName` dimension naming `T`
    ///
    /// Purely a naming convenience over [`Accumulator::new_metrics`].
    pub fn new_metrics_for_type<T: ?Sized>(&self) -> Result<Self, MetricsError> {
        let full = std::any::type_name::<T>();
        let simple = full
            .split('<')
            .next()
            .unwrap_or(full)
            .rsplit("::")
            .next()
            .unwrap_or(full);
        self.new_metrics(&[(CLASS_NAME_DIMENSION, simple)])
    }

    /// Derives a child, runs `block` against it and then flushes the child
    ///
    /// The child is flushed unconditionally once the block completes, so
    /// metrics recorded before a late failure inside the block are never
    /// silently dropped. The parent's buffer is untouched.
    pub async fn with_new_metrics<T>(
        &self,
        dimensions: &[(&str, &str)],
        block: impl for<'a> FnOnce(&'a Accumulator<B>) -> BoxFuture<'a, T>,
    ) -> Result<T, MetricsError> {
        let child = self.new_metrics(dimensions)?;
        let value = block(&child).await;
        child.submit_and_clear().await?;
        Ok(value)
    }

    /// Runs `block` against this accumulator (not a child) and then flushes
    ///
    /// Warns if the buffer was non-empty on entry; those earlier metrics
    /// are flushed together with the block's.
    pub async fn submit_and_clear_with<T>(
        &self,
        block: impl for<'a> FnOnce(&'a Accumulator<B>) -> BoxFuture<'a, T>,
    ) -> Result<T, MetricsError> {
        if !self.buffer.lock().await.is_empty() {
            warn!("buffer is not empty entering submit_and_clear_with, earlier metrics will be flushed with the block's");
        }
        let value = block(self).await;
        self.submit_and_clear().await?;
        Ok(value)
    }

    /// Empties the buffer without submitting; idempotent
    pub async fn clear(&self) {
        self.buffer.lock().await.clear();
    }

    /// Submits the buffer to the backend and clears it, as one critical
    /// section
    ///
    /// The clear happens whether or not the backend accepts the batch: a
    /// failed transmission loses those metrics and the error is then
    /// propagated. Recordings block until the whole operation finishes.
    pub async fn submit_and_clear(&self) -> Result<(), MetricsError> {
        let mut buffer = self.buffer.lock().await;
        let result = self.backend.submit(&self.dimensions, &buffer).await;
        buffer.clear();
        result
    }

    #[cfg(test)]
    pub(crate) async fn snapshot(&self) -> Vec<Metric> {
        self.buffer.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingBackend;
    use futures::FutureExt;
    use std::sync::Arc;

    struct LookupService;

    #[tokio::test]
    async fn repeated_names_accumulate_distinct_entries() {
        let accumulator = Accumulator::new(RecordingBackend::default());
        accumulator.add_count("requests", 2.0).await;
        accumulator.add_count("requests", 3.0).await;

        let buffer = accumulator.snapshot().await;
        assert_eq!(buffer.len(), 2);
        let total: f64 = buffer
            .iter()
            .filter(|m| m.name == "requests")
            .map(|m| m.value)
            .sum();
        assert_eq!(total, 5.0);
    }

    #[tokio::test]
    async fn typed_helpers_pick_the_right_unit() {
        let accumulator = Accumulator::new(RecordingBackend::default());
        accumulator.add_count("requests", 1.0).await;
        accumulator.add_percentage("errorRate", 12.5).await;
        accumulator.add_time("latency", Duration::from_millis(42)).await;
        accumulator
            .add_time_with_unit("elapsed", Duration::from_millis(2500), TimeUnit::Seconds)
            .await
            .unwrap();

        let buffer = accumulator.snapshot().await;
        assert_eq!(buffer[0].unit, MetricUnit::Count);
        assert_eq!(buffer[1].unit, MetricUnit::Percent);
        assert_eq!(buffer[2].unit, MetricUnit::Milliseconds);
        assert_eq!(buffer[2].value, 42.0);
        assert_eq!(buffer[3].unit, MetricUnit::Seconds);
        assert_eq!(buffer[3].value, 2.0);
    }

    #[tokio::test]
    async fn unsupported_time_unit_is_rejected_without_recording() {
        let accumulator = Accumulator::new(RecordingBackend::default());
        let err = accumulator
            .add_time_with_unit("elapsed", Duration::from_micros(9), TimeUnit::Nanoseconds)
            .await
            .unwrap_err();
        assert!(matches!(err, MetricsError::UnsupportedTimeUnit(TimeUnit::Nanoseconds)));
        assert!(accumulator.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn derivation_unions_disjoint_dimensions() {
        let accumulator = Accumulator::with_dimensions(
            RecordingBackend::default(),
            [Dimension::new("Service", "lookup")],
        );
        let child = accumulator.new_metrics(&[("Stage", "prod")]).unwrap();

        assert_eq!(child.dimensions().len(), 2);
        assert!(child.dimensions().contains(&Dimension::new("Service", "")));
        assert!(child.dimensions().contains(&Dimension::new("Stage", "")));
        // parent untouched
        assert_eq!(accumulator.dimensions().len(), 1);
    }

    #[tokio::test]
    async fn derivation_rejects_duplicate_names_whatever_the_value() {
        let accumulator = Accumulator::with_dimensions(
            RecordingBackend::default(),
            [Dimension::new("Stage", "prod")],
        );

        let err = accumulator.new_metrics(&[("Stage", "beta")]).unwrap_err();
        match err {
            MetricsError::DuplicateDimension { current, offending } => {
                assert_eq!(current.len(), 1);
                assert_eq!(current[0].value, "prod");
                assert_eq!(offending.len(), 1);
                assert_eq!(offending[0].name, "Stage");
                assert_eq!(offending[0].value, "beta");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn derivation_for_a_type_adds_the_class_name_dimension() {
        let accumulator = Accumulator::new(RecordingBackend::default());
        let child = accumulator.new_metrics_for_type::<LookupService>().unwrap();

        let dimension = child
            .dimensions()
            .get(&Dimension::new(CLASS_NAME_DIMENSION, ""))
            .unwrap();
        assert_eq!(dimension.value, "LookupService");
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let accumulator = Accumulator::new(RecordingBackend::default());
        accumulator.add_count("requests", 1.0).await;
        accumulator.clear().await;
        assert!(accumulator.snapshot().await.is_empty());
        accumulator.clear().await;
        assert!(accumulator.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn flush_hands_the_batch_and_dimensions_to_the_backend() {
        let backend = RecordingBackend::default();
        let accumulator =
            Accumulator::with_dimensions(backend.clone(), [Dimension::new("Stage", "prod")]);
        accumulator.add_count("requests", 1.0).await;
        accumulator.submit_and_clear().await.unwrap();

        let batches = backend.batches();
        assert_eq!(batches.len(), 1);
        let (dimensions, metrics) = &batches[0];
        assert_eq!(dimensions.len(), 1);
        assert_eq!(dimensions[0].name, "Stage");
        assert_eq!(dimensions[0].value, "prod");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name, "requests");
        assert!(accumulator.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn failed_flush_still_clears_and_propagates() {
        let backend = RecordingBackend::default();
        backend.fail_next_submit();
        let accumulator = Accumulator::new(backend.clone());
        accumulator.add_count("requests", 1.0).await;

        let err = accumulator.submit_and_clear().await.unwrap_err();
        assert!(matches!(err, MetricsError::Backend(_)));
        assert!(accumulator.snapshot().await.is_empty());

        // the next flush starts from an empty buffer
        accumulator.submit_and_clear().await.unwrap();
        assert_eq!(backend.batches().len(), 1);
        assert!(backend.batches()[0].1.is_empty());
    }

    #[tokio::test]
    async fn concurrent_recordings_are_never_lost() {
        let accumulator = Arc::new(Accumulator::new(RecordingBackend::default()));

        let mut handles = Vec::new();
        for i in 0..100 {
            let accumulator = Arc::clone(&accumulator);
            handles.push(tokio::spawn(async move {
                accumulator.add_count("tick", i as f64).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut values: Vec<f64> = accumulator.snapshot().await.iter().map(|m| m.value).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(values.len(), 100);
        for (i, value) in values.iter().enumerate() {
            assert_eq!(*value, i as f64);
        }
    }

    #[tokio::test]
    async fn time_operation_times_successes_and_returns_the_value() {
        let accumulator = Accumulator::new(RecordingBackend::default());

        let value = accumulator
            .time_operation("lookup", || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, MetricsError>(7)
            })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let buffer = accumulator.snapshot().await;
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer[0].name, "lookup");
        assert_eq!(buffer[0].unit, MetricUnit::Milliseconds);
        assert!(buffer[0].value >= 20.0);
    }

    #[tokio::test]
    async fn time_operation_does_not_time_failures() {
        let accumulator = Accumulator::new(RecordingBackend::default());

        let err = accumulator
            .time_operation("lookup", || async { Err::<i32, _>("no route") })
            .await
            .unwrap_err();
        assert_eq!(err, "no route");
        assert!(accumulator.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn with_new_metrics_flushes_the_child_and_spares_the_parent() {
        let backend = RecordingBackend::default();
        let accumulator =
            Accumulator::with_dimensions(backend.clone(), [Dimension::new("Service", "lookup")]);
        accumulator.add_count("parentOnly", 1.0).await;

        let value = accumulator
            .with_new_metrics(&[("Stage", "prod")], |child| {
                async move {
                    child.add_count("requests", 1.0).await;
                    "done"
                }
                .boxed()
            })
            .await
            .unwrap();
        assert_eq!(value, "done");

        let batches = backend.batches();
        assert_eq!(batches.len(), 1);
        let (dimensions, metrics) = &batches[0];
        assert_eq!(dimensions.len(), 2);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name, "requests");

        // parent's buffer was not flushed
        assert_eq!(accumulator.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn with_new_metrics_propagates_duplicate_dimension_errors() {
        let accumulator = Accumulator::with_dimensions(
            RecordingBackend::default(),
            [Dimension::new("Stage", "prod")],
        );

        let err = accumulator
            .with_new_metrics(&[("Stage", "beta")], |_child| async { () }.boxed())
            .await
            .unwrap_err();
        assert!(matches!(err, MetricsError::DuplicateDimension { .. }));
    }

    #[tokio::test]
    async fn submit_and_clear_with_flushes_earlier_metrics_too() {
        let backend = RecordingBackend::default();
        let accumulator = Accumulator::new(backend.clone());
        accumulator.add_count("before", 1.0).await;

        accumulator
            .submit_and_clear_with(|metrics| {
                async move {
                    metrics.add_count("during", 1.0).await;
                }
                .boxed()
            })
            .await
            .unwrap();

        let batches = backend.batches();
        assert_eq!(batches.len(), 1);
        let names: Vec<&str> = batches[0].1.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["before", "during"]);
        assert!(accumulator.snapshot().await.is_empty());
    }
}
