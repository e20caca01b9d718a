//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub signatures_observed: IntCounter,
    pub replications_submitted: IntCounter,
    pub replications_skipped: IntCounter,
    pub replications_failed: IntCounterVec,
    pub fetch_failures: IntCounterVec,
    pub fetch_abandoned: IntCounter,
    pub listing_failures: IntCounterVec,
    pub cursors_seeded: IntCounter,

    // Gauges
    pub watched_addresses: IntGauge,

    // Histograms
    pub tick_latency: Histogram,
    pub submit_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let signatures_observed = IntCounter::with_opts(Opts::new(
            "signatures_observed_total",
            "New signatures picked up from watched addresses",
        ))?;

        let replications_submitted = IntCounter::with_opts(Opts::new(
            "replications_submitted_total",
            "Mirror transactions confirmed",
        ))?;

        let replications_skipped = IntCounter::with_opts(Opts::new(
            "replications_skipped_total",
            "Watched transactions processed without a submission",
        ))?;

        let replications_failed = IntCounterVec::new(
            Opts::new(
                "replications_failed_total",
                "Mirror submissions that failed, by stage",
            ),
            &["stage"],
        )?;

        let fetch_failures = IntCounterVec::new(
            Opts::new(
                "fetch_failures_total",
                "Transaction detail lookups that returned nothing or failed, by category",
            ),
            &["category"],
        )?;

        let fetch_abandoned = IntCounter::with_opts(Opts::new(
            "fetch_abandoned_total",
            "Signatures skipped after exhausting detail lookups",
        ))?;

        let listing_failures = IntCounterVec::new(
            Opts::new("listing_failures_total", "Signature listings that failed, by category"),
            &["category"],
        )?;

        let cursors_seeded = IntCounter::with_opts(Opts::new(
            "cursors_seeded_total",
            "Addresses whose cursor was initialized",
        ))?;

        let watched_addresses =
            IntGauge::with_opts(Opts::new("watched_addresses", "Configured watched addresses"))?;

        let tick_latency = Histogram::with_opts(
            HistogramOpts::new("tick_latency_seconds", "Duration of one monitor tick")
                .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        )?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new(
                "submit_latency_seconds",
                "Send-and-confirm latency of mirror transactions",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(signatures_observed.clone()))?;
        registry.register(Box::new(replications_submitted.clone()))?;
        registry.register(Box::new(replications_skipped.clone()))?;
        registry.register(Box::new(replications_failed.clone()))?;
        registry.register(Box::new(fetch_failures.clone()))?;
        registry.register(Box::new(fetch_abandoned.clone()))?;
        registry.register(Box::new(listing_failures.clone()))?;
        registry.register(Box::new(cursors_seeded.clone()))?;
        registry.register(Box::new(watched_addresses.clone()))?;
        registry.register(Box::new(tick_latency.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;

        Ok(Self {
            registry,
            signatures_observed,
            replications_submitted,
            replications_skipped,
            replications_failed,
            fetch_failures,
            fetch_abandoned,
            listing_failures,
            cursors_seeded,
            watched_addresses,
            tick_latency,
            submit_latency,
        })
    }

    /// Render all metrics in the Prometheus text format
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
