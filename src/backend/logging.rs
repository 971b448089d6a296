//! # Logging backend
//!
//! Serializes each buffered metric to a structured debug line instead of
//! transmitting anywhere; meant for local development and tests

use std::collections::HashSet;

use tracing::debug;

use super::Backend;
use crate::dimension::Dimension;
use crate::error::MetricsError;
use crate::metric::Metric;

/// Backend that writes metrics to the log and nothing else
#[derive(Debug, Clone)]
pub struct Logging {
    namespace: String,
}

impl Logging {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Backend for Logging {
    async fn submit(&self, dimensions: &HashSet<Dimension>, metrics: &[Metric]) -> Result<(), MetricsError> {
        debug!(namespace = %self.namespace, ?dimensions, "submitting metrics");
        for metric in metrics {
            let json = serde_json::to_string(metric)?;
            debug!(metric = %json, "publishing metric");
        }
        Ok(())
    }
}
