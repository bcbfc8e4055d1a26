//! The host: shared state every subsystem hangs off.

use arc_swap::ArcSwap;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::capability::builtin::{AccessLog, StorageEngine};
use crate::capability::{CapabilityCatalog, CapabilityLoader};
use crate::config::HostConfig;
use crate::lifecycle::shutdown::ShutdownCoordinator;
use crate::tenant::providers::ProviderCatalog;
use crate::tenant::TenantRegistry;

/// Process-wide host state.
///
/// Owns the configuration, the capability loader, the tenant registry, and
/// the shutdown coordinator. Capabilities install their shared handles here
/// during registration; the request path only ever reads.
pub struct Host {
    config: ArcSwap<HostConfig>,
    tenants_root: Option<PathBuf>,
    capabilities: CapabilityLoader,
    tenants: TenantRegistry,
    providers: ProviderCatalog,
    storage: OnceLock<Arc<StorageEngine>>,
    access_log: OnceLock<Arc<AccessLog>>,
    shutdown: ShutdownCoordinator,
}

impl Host {
    /// Build a host with the built-in capability and provider catalogs.
    pub fn new(config: HostConfig) -> Arc<Self> {
        Self::with_catalogs(
            config,
            CapabilityCatalog::builtin(),
            ProviderCatalog::builtin(),
            None,
        )
    }

    /// Build a host with explicit catalogs.
    ///
    /// `tenants_root` overrides the configured tenants root when given.
    pub fn with_catalogs(
        config: HostConfig,
        capabilities: CapabilityCatalog,
        providers: ProviderCatalog,
        tenants_root: Option<PathBuf>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: ArcSwap::from_pointee(config),
            tenants_root,
            capabilities: CapabilityLoader::new(capabilities),
            tenants: TenantRegistry::new(),
            providers,
            storage: OnceLock::new(),
            access_log: OnceLock::new(),
            shutdown: ShutdownCoordinator::new(),
        })
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> Arc<HostConfig> {
        self.config.load_full()
    }

    /// The directory holding one subdirectory per tenant.
    pub fn tenants_root(&self) -> PathBuf {
        self.tenants_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.config().tenancy.root))
    }

    pub fn capabilities(&self) -> &CapabilityLoader {
        &self.capabilities
    }

    pub fn tenants(&self) -> &TenantRegistry {
        &self.tenants
    }

    pub fn providers(&self) -> &ProviderCatalog {
        &self.providers
    }

    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Install the shared storage engine. Returns false if one is already
    /// installed.
    pub fn install_storage(&self, engine: Arc<StorageEngine>) -> bool {
        self.storage.set(engine).is_ok()
    }

    /// The storage engine, when the storage capability has registered.
    pub fn storage(&self) -> Option<Arc<StorageEngine>> {
        self.storage.get().cloned()
    }

    /// Install the shared access log. Returns false if one is already
    /// installed.
    pub fn install_access_log(&self, log: Arc<AccessLog>) -> bool {
        self.access_log.set(log).is_ok()
    }

    /// The access log, when the access-log capability has registered.
    pub fn access_log(&self) -> Option<Arc<AccessLog>> {
        self.access_log.get().cloned()
    }

    /// Load the configured core capabilities, in their declared order.
    ///
    /// Failures are per-capability and never stop the sequence.
    pub async fn load_capabilities(self: &Arc<Self>) {
        let config = self.config();
        for name in &config.capabilities.order {
            let options = config
                .capabilities
                .options
                .get(name)
                .cloned()
                .unwrap_or(Value::Null);
            self.capabilities.load(name, &options, self).await;
        }
    }

    /// Load (or reload) one tenant directory by name.
    pub fn load_tenant(self: &Arc<Self>, dir_name: &str) -> bool {
        self.tenants.load_tenant(self, dir_name)
    }

    /// Load every tenant under the tenants root.
    pub fn load_all_tenants(self: &Arc<Self>) -> bool {
        self.tenants.load_all_tenants(self)
    }

    /// Drain capabilities in reverse registration order, exactly once.
    ///
    /// Racing callers wait for the winner's teardown to complete instead
    /// of running it again.
    pub async fn run_teardown(&self) {
        if !self.shutdown.begin_teardown() {
            self.shutdown.wait_complete().await;
            return;
        }
        self.capabilities.shutdown_all().await;
        self.shutdown.complete();
        tracing::info!("Host teardown complete");
    }
}
