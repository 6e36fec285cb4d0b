//! Rolling processing-time history and derived diagnostics.
//!
//! This is a read model: nothing here changes what the optimizer does.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

/// Number of samples kept in the history.
pub const HISTORY_LEN: usize = 60;

/// Snapshot of recent optimizer performance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Duration of the most recent call.
    pub processing_time_ms: f64,
    /// Mean over the history window.
    pub average_processing_ms: f64,
    /// `1000 / average_processing_ms`, or 0 with no usable samples.
    pub frame_rate: f64,
    /// Estimated cache footprint.
    pub memory_usage_mb: f64,
    /// Cache hits over lookups, 0 before the first lookup.
    pub cache_hit_rate: f64,
    pub sample_count: usize,
}

/// Bounded history of processing durations.
#[derive(Clone, Debug, Default)]
pub struct PerformanceMonitor {
    samples: VecDeque<f64>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// Record one call's processing time.
    pub fn record(&mut self, elapsed: Duration) {
        self.record_ms(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn record_ms(&mut self, ms: f64) {
        if !ms.is_finite() || ms < 0.0 {
            return;
        }
        if self.samples.len() == HISTORY_LEN {
            self.samples.pop_front();
        }
        self.samples.push_back(ms);
    }

    pub fn latest_ms(&self) -> f64 {
        self.samples.back().copied().unwrap_or(0.0)
    }

    pub fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Frame rate implied by the mean processing time.
    pub fn frame_rate(&self) -> f64 {
        let avg = self.average_ms();
        if avg > 0.0 { 1000.0 / avg } else { 0.0 }
    }

    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Build a metrics snapshot. Memory and hit rate come from the cache.
    pub fn metrics(&self, memory_usage_mb: f64, cache_hit_rate: f64) -> PerformanceMetrics {
        PerformanceMetrics {
            processing_time_ms: self.latest_ms(),
            average_processing_ms: self.average_ms(),
            frame_rate: self.frame_rate(),
            memory_usage_mb,
            cache_hit_rate,
            sample_count: self.samples.len(),
        }
    }
}
