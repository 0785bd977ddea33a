//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Instant;

/// Metrics registry for one client instance
pub struct Metrics {
    registry: Registry,

    // Counters
    pub mint_attempts: IntCounter,
    pub mint_success: IntCounter,
    pub mint_failed: IntCounter,
    pub mint_rejected_in_flight: IntCounter,
    pub state_refreshes: IntCounter,
    pub stale_responses_discarded: IntCounter,
    pub fetch_failures: IntCounter,

    // Histograms
    pub mint_latency: Histogram,
    pub fetch_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let mint_attempts =
            IntCounter::with_opts(Opts::new("mint_attempts_total", "Mint transactions attempted"))?;

        let mint_success =
            IntCounter::with_opts(Opts::new("mint_success_total", "Mint transactions confirmed"))?;

        let mint_failed =
            IntCounter::with_opts(Opts::new("mint_failed_total", "Mint attempts that failed"))?;

        let mint_rejected_in_flight = IntCounter::with_opts(Opts::new(
            "mint_rejected_in_flight_total",
            "Mint clicks rejected because another mint was in flight",
        ))?;

        let state_refreshes = IntCounter::with_opts(Opts::new(
            "state_refreshes_total",
            "Sale state refreshes started",
        ))?;

        let stale_responses_discarded = IntCounter::with_opts(Opts::new(
            "stale_responses_discarded_total",
            "Fetch responses dropped because a newer refresh had started",
        ))?;

        let fetch_failures = IntCounter::with_opts(Opts::new(
            "fetch_failures_total",
            "Balance or sale account fetches that failed",
        ))?;

        let mint_latency = Histogram::with_opts(
            HistogramOpts::new("mint_latency_seconds", "Mint build-to-confirm latency")
                .buckets(vec![0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let fetch_latency = Histogram::with_opts(
            HistogramOpts::new("fetch_latency_seconds", "Sale state fetch latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(mint_attempts.clone()))?;
        registry.register(Box::new(mint_success.clone()))?;
        registry.register(Box::new(mint_failed.clone()))?;
        registry.register(Box::new(mint_rejected_in_flight.clone()))?;
        registry.register(Box::new(state_refreshes.clone()))?;
        registry.register(Box::new(stale_responses_discarded.clone()))?;
        registry.register(Box::new(fetch_failures.clone()))?;
        registry.register(Box::new(mint_latency.clone()))?;
        registry.register(Box::new(fetch_latency.clone()))?;

        Ok(Self {
            registry,
            mint_attempts,
            mint_success,
            mint_failed,
            mint_rejected_in_flight,
            state_refreshes,
            stale_responses_discarded,
            fetch_failures,
            mint_latency,
            fetch_latency,
        })
    }

    /// Shared handle, as components take it
    pub fn shared() -> anyhow::Result<Arc<Self>> {
        Ok(Arc::new(Self::new()?))
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.start.elapsed().as_secs_f64());
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.mint_attempts.inc();
        metrics.stale_responses_discarded.inc_by(2);
        Timer::new().observe_duration(&metrics.mint_latency);

        let text = metrics.render().unwrap();
        assert!(text.contains("mint_attempts_total 1"));
        assert!(text.contains("stale_responses_discarded_total 2"));
        assert!(text.contains("mint_latency_seconds_count 1"));
    }
}
