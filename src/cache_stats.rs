//! # Cache stats
//!
//! Maps a cache-statistics snapshot onto an accumulator: counts as
//! counts, rates as percentages, load latencies as milliseconds

use crate::accumulator::Accumulator;
use crate::backend::Backend;
use crate::metric::{Metric, MetricUnit};

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Point-in-time snapshot of a cache's counters
///
/// The source library reports load time in nanoseconds; rates are derived
/// here rather than stored, and follow its conventions for empty
/// denominators (a cache with no requests has a hit rate of 1.0 and a
/// miss rate of 0.0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    hit_count: u64,
    miss_count: u64,
    load_success_count: u64,
    load_exception_count: u64,
    eviction_count: u64,
    total_load_time_nanos: u64,
}

impl CacheStats {
    pub fn new(
        hit_count: u64,
        miss_count: u64,
        load_success_count: u64,
        load_exception_count: u64,
        eviction_count: u64,
        total_load_time_nanos: u64,
    ) -> Self {
        Self {
            hit_count,
            miss_count,
            load_success_count,
            load_exception_count,
            eviction_count,
            total_load_time_nanos,
        }
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    pub fn miss_count(&self) -> u64 {
        self.miss_count
    }

    pub fn load_success_count(&self) -> u64 {
        self.load_success_count
    }

    pub fn load_exception_count(&self) -> u64 {
        self.load_exception_count
    }

    pub fn eviction_count(&self) -> u64 {
        self.eviction_count
    }

    pub fn total_load_time_nanos(&self) -> u64 {
        self.total_load_time_nanos
    }

    pub fn request_count(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    pub fn load_count(&self) -> u64 {
        self.load_success_count + self.load_exception_count
    }

    /// Fraction of requests served from cache, in [0, 1]
    pub fn hit_rate(&self) -> f64 {
        match self.request_count() {
            0 => 1.0,
            requests => self.hit_count as f64 / requests as f64,
        }
    }

    /// Fraction of requests that missed, in [0, 1]
    pub fn miss_rate(&self) -> f64 {
        match self.request_count() {
            0 => 0.0,
            requests => self.miss_count as f64 / requests as f64,
        }
    }

    /// Fraction of loads that failed, in [0, 1]
    pub fn load_exception_rate(&self) -> f64 {
        match self.load_count() {
            0 => 0.0,
            loads => self.load_exception_count as f64 / loads as f64,
        }
    }

    /// Mean time spent loading a new value, in nanoseconds
    pub fn average_load_penalty_nanos(&self) -> f64 {
        match self.load_count() {
            0 => 0.0,
            loads => self.total_load_time_nanos as f64 / loads as f64,
        }
    }
}

impl<B: Backend> Accumulator<B> {
    /// Records a cache snapshot as one batch of metrics
    ///
    /// Note: no dimension for the cache's identity is added here; derive
    /// a child accumulator first if you track more than one cache.
    pub async fn add_cache_stats(&self, stats: &CacheStats) {
        self.add_metrics([
            Metric::new("hitCount", stats.hit_count() as f64, MetricUnit::Count),
            Metric::new("evictionCount", stats.eviction_count() as f64, MetricUnit::Count),
            Metric::new("loadCount", stats.load_count() as f64, MetricUnit::Count),
            Metric::new("missCount", stats.miss_count() as f64, MetricUnit::Count),
            Metric::new(
                "loadExceptionCount",
                stats.load_exception_count() as f64,
                MetricUnit::Count,
            ),
            Metric::new(
                "loadSuccessCount",
                stats.load_success_count() as f64,
                MetricUnit::Count,
            ),
            Metric::new("missRate", stats.miss_rate() * 100.0, MetricUnit::Percent),
            Metric::new(
                "loadExceptionRate",
                stats.load_exception_rate() * 100.0,
                MetricUnit::Percent,
            ),
            Metric::new("hitRate", stats.hit_rate() * 100.0, MetricUnit::Percent),
            Metric::new(
                "averageLoadPenalty",
                stats.average_load_penalty_nanos() / NANOS_PER_MILLI,
                MetricUnit::Milliseconds,
            ),
            Metric::new(
                "totalLoadTime",
                stats.total_load_time_nanos() as f64 / NANOS_PER_MILLI,
                MetricUnit::Milliseconds,
            ),
            Metric::new("requestCount", stats.request_count() as f64, MetricUnit::Count),
        ])
        .await;
    }
}
