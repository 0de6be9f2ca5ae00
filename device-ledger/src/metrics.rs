//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_transactions_total{function, mode}` - Transactions executed
//! - `ledger_transaction_failures_total{kind}` - Failed transactions by error kind
//! - `ledger_transaction_duration_seconds{mode}` - Execution latency including commit

use crate::{context::TxMode, error::ErrorKind, Function};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Owns its registry so several ledgers can live in one process.
#[derive(Clone)]
pub struct Metrics {
    /// Transactions executed
    pub transactions_total: IntCounterVec,

    /// Failed transactions
    pub failures_total: IntCounterVec,

    /// Execution latency
    pub duration: HistogramVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_total = IntCounterVec::new(
            Opts::new("ledger_transactions_total", "Total number of transactions executed"),
            &["function", "mode"],
        )?;
        registry.register(Box::new(transactions_total.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new(
                "ledger_transaction_failures_total",
                "Total number of failed transactions by error kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let duration = HistogramVec::new(
            HistogramOpts::new(
                "ledger_transaction_duration_seconds",
                "Histogram of transaction latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.0]),
            &["mode"],
        )?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            transactions_total,
            failures_total,
            duration,
            registry,
        })
    }

    /// Record one executed transaction
    pub fn record_transaction(&self, function: Function, mode: TxMode, duration_seconds: f64) {
        self.transactions_total
            .with_label_values(&[function.name(), mode.as_str()])
            .inc();
        self.duration
            .with_label_values(&[mode.as_str()])
            .observe(duration_seconds);
    }

    /// Record a failed transaction
    pub fn record_failure(&self, kind: ErrorKind) {
        self.failures_total.with_label_values(&[kind.as_str()]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
