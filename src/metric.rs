//! # Metric
//!
//! Immutable measurement records and their unit vocabulary

use serde::{Serialize, Serializer};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::MetricsError;

/// Closed set of measurement kinds
///
/// Serializes to the CloudWatch `StandardUnit` spelling of each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricUnit {
    Count,
    Percent,
    Seconds,
    Milliseconds,
    Bytes,
    None,
}

impl MetricUnit {
    /// Convert to the CloudWatch StandardUnit string
    ///
    /// <https://docs.aws.amazon.com/AmazonCloudWatch/latest/APIReference/API_MetricDatum.html>
    pub fn as_standard_unit(self) -> &'static str {
        match self {
            MetricUnit::Count => "Count",
            MetricUnit::Percent => "Percent",
            MetricUnit::Seconds => "Seconds",
            MetricUnit::Milliseconds => "Milliseconds",
            MetricUnit::Bytes => "Bytes",
            MetricUnit::None => "None",
        }
    }
}

/// Wall-clock unit accepted by [`Accumulator::add_time_with_unit`]
///
/// Only seconds and milliseconds map onto a [`MetricUnit`]; the finer
/// units exist so a bad configuration fails at call time rather than
/// silently recording under the wrong unit.
///
/// [`Accumulator::add_time_with_unit`]: crate::Accumulator::add_time_with_unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    pub fn to_metric_unit(self) -> Result<MetricUnit, MetricsError> {
        match self {
            TimeUnit::Seconds => Ok(MetricUnit::Seconds),
            TimeUnit::Milliseconds => Ok(MetricUnit::Milliseconds),
            other => Err(MetricsError::UnsupportedTimeUnit(other)),
        }
    }

    /// Truncate a duration to this unit's granularity
    pub(crate) fn truncate(self, duration: Duration) -> f64 {
        match self {
            TimeUnit::Seconds => duration.as_secs() as f64,
            TimeUnit::Milliseconds => duration.as_millis() as f64,
            TimeUnit::Microseconds => duration.as_micros() as f64,
            TimeUnit::Nanoseconds => duration.as_nanos() as f64,
        }
    }
}

/// A single recorded measurement
///
/// Immutable once constructed; the timestamp defaults to creation time
/// and serializes as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub timestamp: SystemTime,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64, unit: MetricUnit) -> Self {
        Self {
            name: name.into(),
            value,
            unit,
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_timestamp(name: impl Into<String>, value: f64, unit: MetricUnit, timestamp: SystemTime) -> Self {
        Self {
            name: name.into(),
            value,
            unit,
            timestamp,
        }
    }

    /// Capture time as milliseconds since the unix epoch
    pub(crate) fn epoch_millis(&self) -> u64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }
}

fn serialize_epoch_millis<S: Serializer>(timestamp: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    let millis = timestamp
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64;
    serializer.serialize_u64(millis)
}
