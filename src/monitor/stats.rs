// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Duration statistics kept per accumulator.

use std::time::Duration;

/// Accumulated duration samples with a latency histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationStats {
    /// Number of samples.
    pub samples: u64,

    /// Sum of all samples.
    pub total: Duration,

    /// Shortest sample.
    pub min: Duration,

    /// Longest sample.
    pub max: Duration,

    /// Histogram buckets for latency distribution.
    pub histogram: Histogram,
}

impl DurationStats {
    pub fn new() -> Self {
        Self {
            samples: 0,
            total: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
            histogram: Histogram::default(),
        }
    }

    /// Add one sample.
    pub fn record(&mut self, duration: Duration) {
        self.samples = self.samples.saturating_add(1);
        self.total = self.total.saturating_add(duration);
        self.min = self.min.min(duration);
        self.max = self.max.max(duration);
        self.histogram.record(duration);
    }

    /// Mean sample duration.
    pub fn mean(&self) -> Duration {
        if self.samples == 0 {
            Duration::ZERO
        } else {
            let nanos = self.total.as_nanos() / u128::from(self.samples);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        }
    }

    /// Shortest sample, or zero when nothing has been recorded.
    pub fn min_or_zero(&self) -> Duration {
        if self.samples == 0 {
            Duration::ZERO
        } else {
            self.min
        }
    }
}

impl Default for DurationStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Histogram with fixed buckets for latency tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Upper bucket bounds in microseconds; one extra overflow bucket follows.
    bounds: Vec<u64>,
    counts: Vec<u64>,
}

impl Histogram {
    /// Create a histogram with custom bucket bounds (in microseconds).
    pub fn with_bounds(bounds: Vec<u64>) -> Self {
        let counts = vec![0; bounds.len() + 1];
        Self { bounds, counts }
    }

    pub fn record(&mut self, duration: Duration) {
        let micros = duration.as_micros().min(u64::MAX as u128) as u64;
        let idx = self
            .bounds
            .iter()
            .position(|&b| micros <= b)
            .unwrap_or(self.bounds.len());
        self.counts[idx] += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn bounds(&self) -> &[u64] {
        &self.bounds
    }

    /// Approximate percentile, reported as the upper bound of the bucket the
    /// percentile falls in.
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }

        let target = ((total as f64 * p / 100.0).ceil() as u64).max(1);
        let mut cumulative = 0u64;

        for (i, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                let micros = match self.bounds.get(i) {
                    Some(&bound) => bound,
                    // Overflow bucket has no upper bound.
                    None => self.bounds.last().copied().unwrap_or(0) * 10,
                };
                return Duration::from_micros(micros);
            }
        }

        Duration::ZERO
    }

    pub fn p50(&self) -> Duration {
        self.percentile(50.0)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // 1ms, 5ms, 10ms, 50ms, 100ms, 500ms, 1s, 5s
        Self::with_bounds(vec![
            1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000, 5_000_000,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_stats() {
        let mut stats = DurationStats::new();
        stats.record(Duration::from_millis(10));
        stats.record(Duration::from_millis(20));
        stats.record(Duration::from_millis(30));

        assert_eq!(stats.samples, 3);
        assert_eq!(stats.mean(), Duration::from_millis(20));
        assert_eq!(stats.min, Duration::from_millis(10));
        assert_eq!(stats.max, Duration::from_millis(30));
    }

    #[test]
    fn test_empty_stats() {
        let stats = DurationStats::new();
        assert_eq!(stats.mean(), Duration::ZERO);
        assert_eq!(stats.min_or_zero(), Duration::ZERO);
        assert_eq!(stats.histogram.p50(), Duration::ZERO);
    }

    #[test]
    fn test_mean_past_u32_sample_count() {
        let mut stats = DurationStats::new();
        stats.samples = 1u64 << 32;
        stats.total = Duration::from_secs(1u64 << 33);
        assert_eq!(stats.mean(), Duration::from_secs(2));
    }

    #[test]
    fn test_total_saturates() {
        let mut stats = DurationStats::new();
        stats.record(Duration::MAX);
        stats.record(Duration::from_secs(1));
        assert_eq!(stats.total, Duration::MAX);
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.max, Duration::MAX);
    }

    #[test]
    fn test_histogram_buckets() {
        let mut hist = Histogram::default();
        hist.record(Duration::from_micros(500)); // <=1ms
        hist.record(Duration::from_millis(3)); // <=5ms
        hist.record(Duration::from_millis(12)); // <=50ms
        hist.record(Duration::from_secs(30)); // overflow

        assert_eq!(hist.counts()[0], 1);
        assert_eq!(hist.counts()[1], 1);
        assert_eq!(hist.counts()[3], 1);
        assert_eq!(hist.counts()[hist.bounds().len()], 1);
    }

    #[test]
    fn test_histogram_percentiles() {
        let mut hist = Histogram::default();
        for _ in 0..99 {
            hist.record(Duration::from_millis(2));
        }
        hist.record(Duration::from_millis(200));

        assert_eq!(hist.p50(), Duration::from_millis(5));
        assert_eq!(hist.p99(), Duration::from_millis(5));
        assert_eq!(hist.percentile(100.0), Duration::from_millis(500));
    }
}
