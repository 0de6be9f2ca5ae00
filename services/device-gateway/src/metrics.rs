// Prometheus Metrics for the Device Gateway
// Tracks: request throughput, latency, contract failures

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_with_registry, Encoder, HistogramOpts, HistogramTimer, HistogramVec,
    IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

pub struct Metrics {
    pub registry: Registry,

    // Request metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_in_flight: IntGauge,

    // Contract metrics
    pub contract_failures_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let http_requests_total = register_int_counter_vec_with_registry!(
            Opts::new("gateway_http_requests_total", "Total HTTP requests processed"),
            &["endpoint"],
            registry
        )?;

        let http_request_duration_seconds = register_histogram_vec_with_registry!(
            HistogramOpts::new(
                "gateway_http_request_duration_seconds",
                "HTTP request duration in seconds"
            ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["endpoint"],
            registry
        )?;

        let http_requests_in_flight = register_int_gauge_with_registry!(
            Opts::new("gateway_http_requests_in_flight", "Current HTTP requests being processed"),
            registry
        )?;

        let contract_failures_total = register_int_counter_vec_with_registry!(
            Opts::new("gateway_contract_failures_total", "Contract failures relayed to clients"),
            &["endpoint", "kind"],
            registry
        )?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            contract_failures_total,
        })
    }

    /// Count a request and time it until the guard drops
    pub fn track_request(&self, endpoint: &'static str) -> RequestGuard {
        self.http_requests_total.with_label_values(&[endpoint]).inc();
        self.http_requests_in_flight.inc();
        RequestGuard {
            _timer: self
                .http_request_duration_seconds
                .with_label_values(&[endpoint])
                .start_timer(),
            in_flight: self.http_requests_in_flight.clone(),
        }
    }

    /// Export gateway metrics plus any extra registries in Prometheus text format
    pub fn export(&self, extra: &[&Registry]) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut metric_families = self.registry.gather();
        for registry in extra {
            metric_families.extend(registry.gather());
        }
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Decrements the in-flight gauge and records latency on drop
pub struct RequestGuard {
    _timer: HistogramTimer,
    in_flight: IntGauge,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.in_flight.dec();
    }
}

// Global metrics instance
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_request() {
        let metrics = Metrics::new().unwrap();
        {
            let _guard = metrics.track_request("register");
            assert_eq!(metrics.http_requests_in_flight.get(), 1);
        }
        assert_eq!(metrics.http_requests_in_flight.get(), 0);
        assert_eq!(
            metrics.http_requests_total.with_label_values(&["register"]).get(),
            1
        );
    }

    #[test]
    fn test_export_merges_registries() {
        let metrics = Metrics::new().unwrap();
        let _guard = metrics.track_request("auth");

        let extra = Registry::new();
        let counter = prometheus::IntCounter::new("ledger_probe_total", "probe").unwrap();
        extra.register(Box::new(counter.clone())).unwrap();
        counter.inc();

        let text = metrics.export(&[&extra]).unwrap();
        assert!(text.contains("gateway_http_requests_total"));
        assert!(text.contains("ledger_probe_total 1"));
    }
}
