//! Prometheus metrics for the fedchain node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]; the daemon can encode it
//! into the text exposition format.

use prometheus::{
    exponential_buckets, register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    /// Submissions that reached the admission pipeline.
    pub transactions_received: IntCounter,
    pub transactions_admitted: IntCounter,
    pub transactions_rejected: IntCounter,
    /// Backlog entries handed to another node by the sweep.
    pub backlog_reassigned: IntCounter,

    pub backlog_size: IntGauge,

    /// `write_transaction` latency, including admission, in milliseconds.
    pub write_transaction_ms: Histogram,
}

fn prom(e: prometheus::Error) -> NodeError {
    NodeError::Other(format!("metrics registration failed: {e}"))
}

impl NodeMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let transactions_received = register_int_counter_with_registry!(
            Opts::new(
                "fedchain_transactions_received_total",
                "Transactions submitted to this node"
            ),
            registry
        )
        .map_err(prom)?;

        let transactions_admitted = register_int_counter_with_registry!(
            Opts::new(
                "fedchain_transactions_admitted_total",
                "Transactions that passed admission"
            ),
            registry
        )
        .map_err(prom)?;

        let transactions_rejected = register_int_counter_with_registry!(
            Opts::new(
                "fedchain_transactions_rejected_total",
                "Transactions rejected by admission"
            ),
            registry
        )
        .map_err(prom)?;

        let backlog_reassigned = register_int_counter_with_registry!(
            Opts::new(
                "fedchain_backlog_reassigned_total",
                "Stale backlog entries reassigned"
            ),
            registry
        )
        .map_err(prom)?;

        let backlog_size = register_int_gauge_with_registry!(
            Opts::new("fedchain_backlog_size", "Pending transactions in the backlog"),
            registry
        )
        .map_err(prom)?;

        // 0.1 ms to ~1.6 s
        let write_transaction_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "fedchain_write_transaction_ms",
                "Admission plus backlog write latency in milliseconds"
            )
            .buckets(exponential_buckets(0.1, 2.0, 15).map_err(prom)?),
            registry
        )
        .map_err(prom)?;

        Ok(Self {
            registry,
            transactions_received,
            transactions_admitted,
            transactions_rejected,
            backlog_reassigned,
            backlog_size,
            write_transaction_ms,
        })
    }

    /// Text exposition of every metric.
    pub fn encode(&self) -> Result<String, NodeError> {
        use prometheus::Encoder;
        let mut buf = Vec::new();
        prometheus::TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(prom)?;
        String::from_utf8(buf).map_err(|e| NodeError::Other(e.to_string()))
    }
}
