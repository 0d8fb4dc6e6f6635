//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define sync-engine metrics (apply outcomes, latency, snapshot count)
//! - Expose a Prometheus-compatible scrape endpoint when enabled
//!
//! # Metrics
//! - `proxy_sync_apply_total` (counter): apply cycles by outcome
//! - `proxy_sync_apply_duration_seconds` (histogram): full cycle latency
//! - `proxy_sync_snapshots` (gauge): snapshot files retained after pruning
//! - `proxy_sync_import_hosts_total` (counter): hosts extracted by imports
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library callers
//!   and tests pay nothing
//! - Outcome label values match `ApplyState` names

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Record a finished apply cycle.
pub fn record_apply(outcome: &'static str, start: Instant) {
    ::metrics::counter!("proxy_sync_apply_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("proxy_sync_apply_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_snapshot_count(count: usize) {
    ::metrics::gauge!("proxy_sync_snapshots").set(count as f64);
}

pub fn record_import_hosts(count: usize) {
    ::metrics::counter!("proxy_sync_import_hosts_total").increment(count as u64);
}
