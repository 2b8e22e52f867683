//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Transaction submissions, acceptances, retries and failures
//! - Sequence cache hits and node fetches
//! - Node health

use crate::error::{RelayerError, RelayerResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::{error, info};

lazy_static! {
    // Transaction metrics
    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "relayer_transactions_submitted_total",
        "Total submission attempts by transaction type",
        &["tx_type"]
    ).unwrap();

    pub static ref TX_ACCEPTED: CounterVec = register_counter_vec!(
        "relayer_transactions_accepted_total",
        "Total transactions accepted by the node",
        &["tx_type"]
    ).unwrap();

    pub static ref TX_RETRIES: CounterVec = register_counter_vec!(
        "relayer_transaction_retries_total",
        "Total resubmissions after a sequence conflict",
        &["tx_type", "engine_result"]
    ).unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "relayer_transactions_failed_total",
        "Total transactions that ended in failure",
        &["tx_type", "engine_result"]
    ).unwrap();

    pub static ref TX_LATENCY: HistogramVec = register_histogram_vec!(
        "relayer_transaction_latency_seconds",
        "Time from first attempt to acceptance",
        &["tx_type"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // Sequence metrics
    pub static ref SEQUENCE_CACHE_HITS: Counter = register_counter!(
        "relayer_sequence_cache_hits_total",
        "Sequence resolutions served from the cache"
    ).unwrap();

    pub static ref SEQUENCE_FETCHES: Counter = register_counter!(
        "relayer_sequence_fetches_total",
        "Sequence resolutions that queried the node"
    ).unwrap();

    // Health metrics
    pub static ref NODE_HEALTHY: Gauge = register_gauge!(
        "relayer_node_healthy",
        "Node health status (1=healthy, 0=unhealthy)"
    ).unwrap();

    pub static ref HEALTH_CHECK_SUCCESS: Counter = register_counter!(
        "relayer_health_check_success_total",
        "Total successful health checks"
    ).unwrap();

    pub static ref HEALTH_CHECK_FAILURE: Counter = register_counter!(
        "relayer_health_check_failure_total",
        "Total failed health checks"
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> RelayerResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| RelayerError::Internal(format!("Metrics server failed: {}", e)))?;

        Ok(())
    }
}

/// Render every registered metric in the text exposition format
pub fn render() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}

async fn metrics_handler() -> Result<String, StatusCode> {
    render().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// Helper functions to record metrics

pub fn record_tx_submitted(tx_type: &str) {
    TX_SUBMITTED.with_label_values(&[tx_type]).inc();
}

pub fn record_tx_accepted(tx_type: &str) {
    TX_ACCEPTED.with_label_values(&[tx_type]).inc();
}

pub fn record_tx_retry(tx_type: &str, engine_result: &str) {
    TX_RETRIES.with_label_values(&[tx_type, engine_result]).inc();
}

pub fn record_tx_failed(tx_type: &str, engine_result: &str) {
    TX_FAILED.with_label_values(&[tx_type, engine_result]).inc();
}

pub fn record_tx_latency(tx_type: &str, latency_secs: f64) {
    TX_LATENCY.with_label_values(&[tx_type]).observe(latency_secs);
}

pub fn record_sequence_cache_hit() {
    SEQUENCE_CACHE_HITS.inc();
}

pub fn record_sequence_fetch() {
    SEQUENCE_FETCHES.inc();
}

pub fn record_node_health(healthy: bool) {
    NODE_HEALTHY.set(if healthy { 1.0 } else { 0.0 });
    if healthy {
        HEALTH_CHECK_SUCCESS.inc();
    } else {
        HEALTH_CHECK_FAILURE.inc();
    }
}
