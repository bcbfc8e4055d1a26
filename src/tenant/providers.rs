//! Provider catalogs for discovered tenant modules.
//!
//! # Responsibilities
//! - Map provider names to service constructors and plugin initializers
//! - Instantiate discovered service manifests against a tenant's context
//! - Ship the built-in provider set
//!
//! # Design Decisions
//! - Providers are registered in code; a manifest only names one. An
//!   unknown name is a per-module load failure, logged and skipped
//! - A provider may declare its kind at registration; the uppercase-name
//!   heuristic applies only to providers registered without one
//! - Services receive the tenant's storage namespace and merged config;
//!   plugins receive the tenant id, merged config, and host reference

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::capability::builtin::StorageNamespace;
use crate::host::Host;
use crate::tenant::context::{RouteAction, RouteSpec};
use crate::tenant::discovery::{classify, DiscoveredModule, ModuleKind};

/// Errors raised while instantiating or invoking discovered modules.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The manifest names a provider the catalog does not know.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// The manifest is malformed for its module type.
    #[error("invalid module manifest: {0}")]
    InvalidManifest(String),

    /// The provider needs the storage capability and it is not loaded.
    #[error("storage capability is not loaded")]
    StorageUnavailable,

    /// A service invocation failed.
    #[error("service invocation failed: {0}")]
    Invoke(String),
}

/// A service instantiated for one tenant.
pub trait TenantService: Send + Sync {
    fn invoke(&self, input: &Value) -> Result<Value, ProviderError>;
}

/// Context a service provider builds against.
pub struct ServiceContext<'a> {
    /// The tenant's namespaced storage view, when the storage capability
    /// is loaded.
    pub storage: Option<StorageNamespace>,
    /// The tenant's merged configuration tree.
    pub config: &'a Value,
}

/// Context a plugin initializer runs against.
pub struct PluginContext<'a> {
    pub tenant: &'a str,
    pub config: &'a Value,
    pub host: &'a Arc<Host>,
    /// The manifest's `options` table.
    pub options: &'a Value,
}

/// What a plugin contributed to its tenant.
#[derive(Default)]
pub struct PluginOutcome {
    pub routes: Vec<RouteSpec>,
}

type ServiceBuild =
    fn(&ServiceContext<'_>, &Value) -> Result<Arc<dyn TenantService>, ProviderError>;
type PluginBuild = fn(&PluginContext<'_>) -> Result<PluginOutcome, ProviderError>;

struct ServiceProvider {
    declared_kind: Option<ModuleKind>,
    build: ServiceBuild,
}

struct PluginProvider {
    build: PluginBuild,
}

/// A discovered service after instantiation.
#[derive(Debug)]
pub struct ServiceInstance {
    provider: Option<String>,
    kind: ModuleKind,
    value: ServiceValue,
}

enum ServiceValue {
    Callable(Arc<dyn TenantService>),
    Static(Value),
}

impl std::fmt::Debug for ServiceValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceValue::Callable(_) => f.write_str("Callable(..)"),
            ServiceValue::Static(v) => f.debug_tuple("Static").field(v).finish(),
        }
    }
}

impl ServiceInstance {
    /// How the module was classified at load time.
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// The provider name the manifest resolved to, if any.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Invoke the service. Static values are returned verbatim.
    pub fn invoke(&self, input: &Value) -> Result<Value, ProviderError> {
        match &self.value {
            ServiceValue::Callable(service) => service.invoke(input),
            ServiceValue::Static(value) => Ok(value.clone()),
        }
    }
}

/// Registry of known service and plugin providers.
pub struct ProviderCatalog {
    services: HashMap<String, ServiceProvider>,
    plugins: HashMap<String, PluginProvider>,
}

impl ProviderCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            plugins: HashMap::new(),
        }
    }

    /// Catalog with the built-in provider set.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register_service("KeyValue", Some(ModuleKind::Constructor), build_key_value);
        catalog.register_service("counter", Some(ModuleKind::Factory), build_counter);
        catalog.register_service("echo", None, build_echo);
        catalog.register_plugin("seed-data", seed_data_plugin);
        catalog.register_plugin("welcome-route", welcome_route_plugin);
        catalog
    }

    /// Register a service provider, replacing any previous entry.
    pub fn register_service(
        &mut self,
        name: &str,
        declared_kind: Option<ModuleKind>,
        build: ServiceBuild,
    ) {
        self.services.insert(
            name.to_string(),
            ServiceProvider {
                declared_kind,
                build,
            },
        );
    }

    /// Register a plugin provider, replacing any previous entry.
    pub fn register_plugin(&mut self, name: &str, build: PluginBuild) {
        self.plugins.insert(name.to_string(), PluginProvider { build });
    }

    /// Instantiate a discovered service manifest.
    ///
    /// The manifest's `provider` field (defaulting to the module name)
    /// selects the provider; classification follows the manifest, then the
    /// provider's declared kind, then the naming heuristic.
    pub fn instantiate_service(
        &self,
        module: &DiscoveredModule,
        ctx: &ServiceContext<'_>,
    ) -> Result<ServiceInstance, ProviderError> {
        let manifest = &module.manifest;
        let provider_name = manifest
            .get("provider")
            .and_then(Value::as_str)
            .unwrap_or(&module.name);

        let declared = self
            .services
            .get(provider_name)
            .and_then(|p| p.declared_kind);
        let kind = classify(manifest, declared, provider_name).ok_or_else(|| {
            ProviderError::InvalidManifest(format!(
                "unknown kind '{}'",
                manifest.get("kind").and_then(Value::as_str).unwrap_or("")
            ))
        })?;

        if kind == ModuleKind::Value {
            let value = manifest
                .get("value")
                .cloned()
                .ok_or_else(|| ProviderError::InvalidManifest("value module has no 'value' table".into()))?;
            return Ok(ServiceInstance {
                provider: None,
                kind,
                value: ServiceValue::Static(value),
            });
        }

        let provider = self
            .services
            .get(provider_name)
            .ok_or_else(|| ProviderError::UnknownProvider(provider_name.to_string()))?;
        let options = manifest.get("options").cloned().unwrap_or(Value::Null);
        let service = (provider.build)(ctx, &options)?;

        Ok(ServiceInstance {
            provider: Some(provider_name.to_string()),
            kind,
            value: ServiceValue::Callable(service),
        })
    }

    /// Run a plugin by provider name.
    pub fn run_plugin(
        &self,
        name: &str,
        ctx: &PluginContext<'_>,
    ) -> Result<PluginOutcome, ProviderError> {
        let provider = self
            .plugins
            .get(name)
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))?;
        (provider.build)(ctx)
    }

    /// Service provider names known to this catalog, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// Built-in service providers.

struct KeyValueService {
    storage: StorageNamespace,
}

impl TenantService for KeyValueService {
    fn invoke(&self, input: &Value) -> Result<Value, ProviderError> {
        let op = input
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Invoke("missing 'op'".into()))?;
        match op {
            "get" => {
                let key = required_key(input)?;
                Ok(json!({"key": key, "value": self.storage.get(key)}))
            }
            "set" => {
                let key = required_key(input)?;
                let value = input
                    .get("value")
                    .cloned()
                    .ok_or_else(|| ProviderError::Invoke("missing 'value'".into()))?;
                self.storage.set(key, value);
                Ok(json!({"key": key, "stored": true}))
            }
            "delete" => {
                let key = required_key(input)?;
                Ok(json!({"key": key, "deleted": self.storage.delete(key)}))
            }
            "keys" => Ok(json!({"keys": self.storage.keys()})),
            other => Err(ProviderError::Invoke(format!("unknown op '{other}'"))),
        }
    }
}

fn required_key(input: &Value) -> Result<&str, ProviderError> {
    input
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Invoke("missing 'key'".into()))
}

fn build_key_value(
    ctx: &ServiceContext<'_>,
    _options: &Value,
) -> Result<Arc<dyn TenantService>, ProviderError> {
    let storage = ctx.storage.clone().ok_or(ProviderError::StorageUnavailable)?;
    Ok(Arc::new(KeyValueService { storage }))
}

struct CounterService {
    storage: StorageNamespace,
    key: String,
}

impl TenantService for CounterService {
    fn invoke(&self, _input: &Value) -> Result<Value, ProviderError> {
        let count = self.storage.increment(&self.key);
        Ok(json!({"key": self.key, "count": count}))
    }
}

fn build_counter(
    ctx: &ServiceContext<'_>,
    options: &Value,
) -> Result<Arc<dyn TenantService>, ProviderError> {
    let storage = ctx.storage.clone().ok_or(ProviderError::StorageUnavailable)?;
    let key = options
        .get("key")
        .and_then(Value::as_str)
        .unwrap_or("count")
        .to_string();
    Ok(Arc::new(CounterService { storage, key }))
}

struct EchoService;

impl TenantService for EchoService {
    fn invoke(&self, input: &Value) -> Result<Value, ProviderError> {
        Ok(json!({"echo": input}))
    }
}

fn build_echo(
    _ctx: &ServiceContext<'_>,
    _options: &Value,
) -> Result<Arc<dyn TenantService>, ProviderError> {
    Ok(Arc::new(EchoService))
}

// Built-in plugin providers.

/// Writes the manifest's `entries` table into the tenant's storage namespace.
fn seed_data_plugin(ctx: &PluginContext<'_>) -> Result<PluginOutcome, ProviderError> {
    let engine = ctx.host.storage().ok_or(ProviderError::StorageUnavailable)?;
    let entries = ctx
        .options
        .get("entries")
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::InvalidManifest("seed-data needs an 'entries' table".into()))?;

    let storage = engine.namespace(ctx.tenant);
    for (key, value) in entries {
        storage.set(key, value.clone());
    }
    tracing::debug!(tenant = %ctx.tenant, entries = entries.len(), "Seeded tenant storage");
    Ok(PluginOutcome::default())
}

/// Contributes a greeting route under the tenant prefix.
fn welcome_route_plugin(ctx: &PluginContext<'_>) -> Result<PluginOutcome, ProviderError> {
    let path = ctx
        .options
        .get("path")
        .and_then(Value::as_str)
        .unwrap_or("/welcome")
        .to_string();
    let name = ctx
        .config
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(ctx.tenant);

    Ok(PluginOutcome {
        routes: vec![RouteSpec {
            name: "welcome".to_string(),
            method: "GET".to_string(),
            path,
            action: RouteAction::Static(json!({"message": format!("Welcome to {name}")})),
        }],
    })
}
