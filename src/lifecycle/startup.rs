//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Load capabilities, then tenants, strictly sequentially
//! - Start background tasks (signals, watcher, admin API)
//! - Bind the listener and begin accepting traffic last
//!
//! # Design Decisions
//! - The only fatal startup error is the main listener failing to bind;
//!   everything else logs and continues degraded
//! - Teardown runs after the server drains, guarded by the coordinator

use tokio::net::TcpListener;

use crate::admin;
use crate::config::HostConfig;
use crate::host::Host;
use crate::http::HttpServer;
use crate::lifecycle::signals;
use crate::observability::metrics;
use crate::tenant::watcher::TenantWatcher;

/// Run the host to completion: startup, serve, teardown.
pub async fn run(config: HostConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let host = Host::new(config.clone());
    host.load_capabilities().await;
    host.load_all_tenants();

    signals::install_panic_hook(&host);
    tokio::spawn(signals::listen(host.clone()));

    if config.tenancy.watch {
        let (watcher, mut reloads) = TenantWatcher::new(&host.tenants_root());
        match watcher.run() {
            Ok(guard) => {
                let host = host.clone();
                tokio::spawn(async move {
                    // The notify handle must stay alive for events to flow.
                    let _guard = guard;
                    while let Some(dir) = reloads.recv().await {
                        host.load_tenant(&dir);
                    }
                });
            }
            Err(e) => tracing::warn!(error = %e, "Tenant watcher failed to start"),
        }
    }

    if config.admin.enabled {
        match TcpListener::bind(&config.admin.bind_address).await {
            Ok(listener) => {
                let host = host.clone();
                tokio::spawn(async move {
                    if let Err(e) = admin::run_admin(host, listener).await {
                        tracing::error!(error = %e, "Admin API stopped with error");
                    }
                });
            }
            Err(e) => tracing::error!(
                error = %e,
                address = %config.admin.bind_address,
                "Failed to bind admin listener"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(host.clone());
    server.run(listener).await?;

    host.run_teardown().await;
    Ok(())
}
