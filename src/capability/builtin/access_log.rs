//! Request access logging capability.
//!
//! Counts every dispatched request and optionally emits a per-request log
//! line. The final count is reported at teardown.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::capability::contract::{Capability, CapabilityError};
use crate::host::Host;

/// Shared access log handle installed on the host.
pub struct AccessLog {
    requests: AtomicU64,
    log_requests: bool,
}

impl AccessLog {
    fn new(log_requests: bool) -> Self {
        Self {
            requests: AtomicU64::new(0),
            log_requests,
        }
    }

    /// Record one handled request.
    pub fn record(&self, method: &str, path: &str, status: u16, tenant: &str) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if self.log_requests {
            tracing::info!(method, path, status, tenant, "Request handled");
        }
    }

    /// Total requests recorded so far.
    pub fn total(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

/// The `access-log` capability.
pub struct AccessLogCapability {
    log: OnceLock<Arc<AccessLog>>,
}

impl AccessLogCapability {
    pub fn new() -> Self {
        Self {
            log: OnceLock::new(),
        }
    }
}

impl Default for AccessLogCapability {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for AccessLogCapability {
    fn name(&self) -> &str {
        "access-log"
    }

    async fn register(&self, host: &Arc<Host>, options: &Value) -> Result<(), CapabilityError> {
        let log_requests = options
            .get("log_requests")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let log = Arc::new(AccessLog::new(log_requests));
        let _ = self.log.set(log.clone());

        if !host.install_access_log(log) {
            return Err(CapabilityError::Registration(
                "access log already installed".to_string(),
            ));
        }
        Ok(())
    }

    async fn shutdown(&self) {
        if let Some(log) = self.log.get() {
            tracing::info!(requests = log.total(), "Access log closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts() {
        let log = AccessLog::new(false);
        log.record("GET", "/a", 200, "acme");
        log.record("POST", "/b", 404, "none");
        assert_eq!(log.total(), 2);
    }
}
