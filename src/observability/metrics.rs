//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define host metrics (request rates, latency, tenant and capability counts)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `host_requests_total` (counter): requests by method, status, tenant
//! - `host_request_duration_seconds` (histogram): latency distribution
//! - `host_tenants_registered` (gauge): tenants currently in the registry
//! - `host_tenant_loads_total` (counter): successful tenant loads by tenant
//! - `host_capabilities_loaded_total` (counter): capability registrations by name
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels for method, status code, and tenant id

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus exporter on the given address.
///
/// A failed install is logged and metrics become no-ops; the host keeps
/// running without them.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, tenant: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("tenant", tenant.to_string()),
    ];
    counter!("host_requests_total", &labels).increment(1);
    histogram!("host_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// Record a tenant registration and the new registry size.
pub fn record_tenant_registered(id: &str, total: usize) {
    counter!("host_tenant_loads_total", "tenant" => id.to_string()).increment(1);
    gauge!("host_tenants_registered").set(total as f64);
}

/// Record a capability registration.
pub fn record_capability_loaded(name: &str) {
    counter!("host_capabilities_loaded_total", "capability" => name.to_string()).increment(1);
}
