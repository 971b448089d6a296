//! # CloudWatch backend
//!
//! Translates buffered metrics into PutMetricData wire records and
//! transmits them through a [`CloudWatchClient`], chunked to the
//! per-call record limit
//!
//! <https://docs.aws.amazon.com/AmazonCloudWatch/latest/APIReference/API_PutMetricData.html>

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::Backend;
use crate::dimension::Dimension;
use crate::error::MetricsError;
use crate::metric::Metric;
use crate::BoxError;

/// PutMetricData accepts at most 1000 records per call
pub const MAX_DATA_PER_CALL: usize = 1000;

/// Wire record for a single measurement
///
/// Every record in a batch carries the accumulator's full dimension set;
/// dimensions are instance-level, not per-metric.
#[derive(Debug, Clone, Serialize)]
pub struct MetricDatum {
    #[serde(rename = "MetricName")]
    pub metric_name: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: u64,
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "Unit")]
    pub unit: &'static str,
    #[serde(rename = "Dimensions")]
    pub dimensions: Vec<Dimension>,
}

/// The transmission call a CloudWatch-style destination must provide
pub trait CloudWatchClient: Send + Sync {
    fn put_metric_data(
        &self,
        namespace: &str,
        data: Vec<MetricDatum>,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Backend that batches metrics into PutMetricData calls
pub struct CloudWatch<C> {
    namespace: String,
    client: Arc<C>,
}

impl<C> CloudWatch<C> {
    pub fn new(namespace: impl Into<String>, client: C) -> Self {
        Self {
            namespace: namespace.into(),
            client: Arc::new(client),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

// Derived accumulators share the client
impl<C> Clone for CloudWatch<C> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: CloudWatchClient> Backend for CloudWatch<C> {
    async fn submit(&self, dimensions: &HashSet<Dimension>, metrics: &[Metric]) -> Result<(), MetricsError> {
        debug!(
            namespace = %self.namespace,
            count = metrics.len(),
            "submitting metrics"
        );

        let dimensions: Vec<Dimension> = dimensions.iter().cloned().collect();
        let data: Vec<MetricDatum> = metrics
            .iter()
            .map(|metric| MetricDatum {
                metric_name: metric.name.clone(),
                timestamp: metric.epoch_millis(),
                value: metric.value,
                unit: metric.unit.as_standard_unit(),
                dimensions: dimensions.clone(),
            })
            .collect();

        if data.len() > MAX_DATA_PER_CALL {
            warn!(
                count = data.len(),
                "flushing more than {MAX_DATA_PER_CALL} metrics from a single accumulator"
            );
        }

        for chunk in data.chunks(MAX_DATA_PER_CALL) {
            self.client
                .put_metric_data(&self.namespace, chunk.to_vec())
                .await
                .map_err(MetricsError::Backend)?;
        }

        Ok(())
    }
}
