//! Server entry point.

use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tenant_host::config::loader::load_config;
use tenant_host::config::HostConfig;
use tenant_host::lifecycle::startup;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => HostConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "tenant_host={},tower_http=warn",
                    config.observability.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tenant-host starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tenants_root = %config.tenancy.root,
        protected_prefix = %config.tenancy.protected_prefix,
        capabilities = ?config.capabilities.order,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
