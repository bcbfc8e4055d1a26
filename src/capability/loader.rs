//! Process-wide capability loading and caching.
//!
//! # Responsibilities
//! - Load each named capability at most once per process
//! - Drive the configured startup order
//! - Tear capabilities down in reverse registration order
//!
//! # Design Decisions
//! - Cache misses are serialized behind a mutex with a second cache check,
//!   so concurrent first loads run the registration side effect exactly once
//! - A failed registration is not cached; a later call may retry
//! - One capability failing never prevents the next from loading

use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::capability::catalog::CapabilityCatalog;
use crate::capability::contract::Capability;
use crate::host::Host;
use crate::observability::metrics;

/// Load-once cache of registered capabilities.
pub struct CapabilityLoader {
    catalog: CapabilityCatalog,
    cache: DashMap<String, Arc<dyn Capability>>,
    /// Names in the order they were registered, for reverse teardown.
    registration_order: Mutex<Vec<String>>,
    /// Serializes cache misses so registration runs at most once per name.
    load_gate: tokio::sync::Mutex<()>,
}

impl CapabilityLoader {
    /// Create a loader over a catalog of known capabilities.
    pub fn new(catalog: CapabilityCatalog) -> Self {
        Self {
            catalog,
            cache: DashMap::new(),
            registration_order: Mutex::new(Vec::new()),
            load_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Load a capability by name, registering it on first use.
    ///
    /// Returns the cached handle on every subsequent call without re-running
    /// registration. Unknown names and failed registrations return `None`.
    pub async fn load(
        &self,
        name: &str,
        options: &Value,
        host: &Arc<Host>,
    ) -> Option<Arc<dyn Capability>> {
        if let Some(entry) = self.cache.get(name) {
            return Some(entry.value().clone());
        }

        let _gate = self.load_gate.lock().await;
        if let Some(entry) = self.cache.get(name) {
            return Some(entry.value().clone());
        }

        let capability = match self.catalog.get(name) {
            Some(c) => c,
            None => {
                tracing::warn!(capability = %name, "Capability not in catalog, skipping");
                return None;
            }
        };

        match capability.register(host, options).await {
            Ok(()) => {
                self.cache.insert(name.to_string(), capability.clone());
                self.registration_order
                    .lock()
                    .expect("registration order lock poisoned")
                    .push(name.to_string());
                metrics::record_capability_loaded(name);
                tracing::info!(capability = %name, "Capability registered");
                Some(capability)
            }
            Err(e) => {
                tracing::warn!(capability = %name, error = %e, "Capability registration failed, skipping");
                None
            }
        }
    }

    /// True when the named capability has been registered.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Registered capability names in registration order.
    pub fn loaded_names(&self) -> Vec<String> {
        self.registration_order
            .lock()
            .expect("registration order lock poisoned")
            .clone()
    }

    /// Tear down every registered capability, first registered last closed.
    pub async fn shutdown_all(&self) {
        let order = self.loaded_names();
        for name in order.iter().rev() {
            let capability = self.cache.get(name).map(|r| r.value().clone());
            if let Some(capability) = capability {
                capability.shutdown().await;
                tracing::info!(capability = %name, "Capability closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::contract::CapabilityError;
    use crate::config::HostConfig;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingCapability {
        name: &'static str,
        registrations: Arc<AtomicU32>,
        shutdowns: Arc<AtomicU32>,
        fail: bool,
    }

    #[async_trait]
    impl Capability for CountingCapability {
        fn name(&self) -> &str {
            self.name
        }

        async fn register(&self, _host: &Arc<Host>, _options: &Value) -> Result<(), CapabilityError> {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(CapabilityError::Registration("forced failure".into()))
            } else {
                Ok(())
            }
        }

        async fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_host(catalog: CapabilityCatalog) -> Arc<Host> {
        Host::with_catalogs(
            HostConfig::default(),
            catalog,
            crate::tenant::providers::ProviderCatalog::builtin(),
            None,
        )
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let registrations = Arc::new(AtomicU32::new(0));
        let mut catalog = CapabilityCatalog::new();
        catalog.register(Arc::new(CountingCapability {
            name: "counting",
            registrations: registrations.clone(),
            shutdowns: Arc::new(AtomicU32::new(0)),
            fail: false,
        }));

        let host = test_host(catalog);
        let first = host
            .capabilities()
            .load("counting", &json!({}), &host)
            .await
            .unwrap();
        let second = host
            .capabilities()
            .load("counting", &json!({}), &host)
            .await
            .unwrap();

        assert_eq!(registrations.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_concurrent_first_loads_register_once() {
        let registrations = Arc::new(AtomicU32::new(0));
        let mut catalog = CapabilityCatalog::new();
        catalog.register(Arc::new(CountingCapability {
            name: "racy",
            registrations: registrations.clone(),
            shutdowns: Arc::new(AtomicU32::new(0)),
            fail: false,
        }));

        let host = test_host(catalog);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let host = host.clone();
            handles.push(tokio::spawn(async move {
                host.capabilities().load("racy", &json!({}), &host).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }
        assert_eq!(registrations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_name_is_non_fatal() {
        let host = test_host(CapabilityCatalog::new());
        assert!(host
            .capabilities()
            .load("nope", &json!({}), &host)
            .await
            .is_none());
        assert!(!host.capabilities().is_loaded("nope"));
    }

    #[tokio::test]
    async fn test_failed_registration_not_cached() {
        let registrations = Arc::new(AtomicU32::new(0));
        let mut catalog = CapabilityCatalog::new();
        catalog.register(Arc::new(CountingCapability {
            name: "broken",
            registrations: registrations.clone(),
            shutdowns: Arc::new(AtomicU32::new(0)),
            fail: true,
        }));

        let host = test_host(catalog);
        assert!(host
            .capabilities()
            .load("broken", &json!({}), &host)
            .await
            .is_none());
        assert!(host
            .capabilities()
            .load("broken", &json!({}), &host)
            .await
            .is_none());
        // Not cached, so each call retried the registration.
        assert_eq!(registrations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        struct OrderedCapability {
            name: &'static str,
            order: Arc<Mutex<Vec<&'static str>>>,
        }

        #[async_trait]
        impl Capability for OrderedCapability {
            fn name(&self) -> &str {
                self.name
            }
            async fn register(
                &self,
                _host: &Arc<Host>,
                _options: &Value,
            ) -> Result<(), CapabilityError> {
                Ok(())
            }
            async fn shutdown(&self) {
                self.order.lock().unwrap().push(self.name);
            }
        }

        let mut catalog = CapabilityCatalog::new();
        catalog.register(Arc::new(OrderedCapability {
            name: "first",
            order: order.clone(),
        }));
        catalog.register(Arc::new(OrderedCapability {
            name: "second",
            order: order.clone(),
        }));

        let host = test_host(catalog);
        host.capabilities().load("first", &json!({}), &host).await;
        host.capabilities().load("second", &json!({}), &host).await;
        host.capabilities().shutdown_all().await;

        assert_eq!(*order.lock().unwrap(), vec!["second", "first"]);
    }
}
