//! The process-wide tenant registry.
//!
//! # Responsibilities
//! - Load tenants from the tenants root directory
//! - Hold the id → context map dispatch reads on every request
//! - Replace a tenant's context atomically on reload
//!
//! # Design Decisions
//! - Loads are sequential; lookups are lock-free concurrent reads
//! - Every failure inside a tenant load is caught, logged, and surfaced
//!   as `false`; `load_all_tenants` always completes its sweep
//! - An inactive tenant is a deliberate skip, not an error

use dashmap::DashMap;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::merge::merge_all;
use crate::host::Host;
use crate::observability::metrics;
use crate::tenant::context::{RouteSpec, TenantContext};
use crate::tenant::discovery::discover;
use crate::tenant::providers::{PluginContext, ServiceContext};

/// Process-wide mapping from tenant id to its context.
pub struct TenantRegistry {
    entries: DashMap<String, Arc<TenantContext>>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Full context lookup.
    pub fn get_context(&self, id: &str) -> Option<Arc<TenantContext>> {
        self.entries.get(id).map(|r| r.value().clone())
    }

    /// Config-only lookup.
    pub fn get_tenant(&self, id: &str) -> Option<Value> {
        self.entries.get(id).map(|r| r.value().config.clone())
    }

    /// Registered tenant ids, sorted.
    pub fn list_tenants(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load (or reload) one tenant directory.
    ///
    /// Returns `false` for a missing directory, an inactive tenant, or any
    /// load failure; all are logged here and never propagate.
    pub fn load_tenant(&self, host: &Arc<Host>, dir_name: &str) -> bool {
        let dir = host.tenants_root().join(dir_name);
        if !dir.is_dir() {
            tracing::warn!(tenant = %dir_name, path = ?dir, "Tenant directory not found");
            return false;
        }

        match self.build_context(host, dir_name, &dir) {
            Ok(Some(context)) => {
                let id = context.id.clone();
                let services = context.services.len();
                let routes = context.routes.len();
                self.entries.insert(id.clone(), Arc::new(context));
                metrics::record_tenant_registered(&id, self.entries.len());
                tracing::info!(tenant = %id, services, routes, "Tenant registered");
                true
            }
            Ok(None) => {
                tracing::info!(tenant = %dir_name, "Tenant inactive, skipping");
                false
            }
            Err(e) => {
                tracing::warn!(tenant = %dir_name, error = %e, "Tenant load failed");
                false
            }
        }
    }

    /// Load every tenant under the tenants root, sequentially.
    ///
    /// Hidden entries and plain files are skipped. Always returns `true`
    /// once every directory has been attempted, whatever the individual
    /// outcomes.
    pub fn load_all_tenants(&self, host: &Arc<Host>) -> bool {
        let root = host.tenants_root();
        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(root = ?root, error = %e, "Tenants root not readable");
                return true;
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(ToString::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();

        for name in &names {
            self.load_tenant(host, name);
        }
        tracing::info!(
            attempted = names.len(),
            registered = self.entries.len(),
            "Tenant sweep complete"
        );
        true
    }

    /// Build a fresh context for one tenant directory.
    ///
    /// `Ok(None)` means the merged config marked the tenant inactive.
    fn build_context(
        &self,
        host: &Arc<Host>,
        dir_name: &str,
        dir: &Path,
    ) -> Result<Option<TenantContext>, String> {
        let id = registry_id(dir, dir_name)?;
        if id != dir_name {
            tracing::debug!(tenant = %dir_name, id = %id, "Tenant id overridden by index manifest");
        }

        let defaults = json!({"id": id, "name": id, "active": true});
        let merged = merge_all(defaults, config_sources(dir)?).map_err(|e| e.to_string())?;

        if !merged.get("active").and_then(Value::as_bool).unwrap_or(true) {
            return Ok(None);
        }

        let mut schemas = BTreeMap::new();
        for module in discover(&dir.join("schemas")) {
            match module.manifest.get("id").and_then(Value::as_str) {
                Some(schema_id) => {
                    schemas.insert(schema_id.to_string(), module.manifest.clone());
                }
                None => tracing::warn!(
                    tenant = %id, module = %module.name,
                    "Schema has no 'id' field, skipping"
                ),
            }
        }

        let storage = host.storage().map(|engine| engine.namespace(&id));
        let mut services = BTreeMap::new();
        for module in discover(&dir.join("services")) {
            let ctx = ServiceContext {
                storage: storage.clone(),
                config: &merged,
            };
            match host.providers().instantiate_service(&module, &ctx) {
                Ok(instance) => {
                    services.insert(module.name.clone(), instance);
                }
                Err(e) => tracing::warn!(
                    tenant = %id, module = %module.name, error = %e,
                    "Service module failed to load, skipping"
                ),
            }
        }

        let mut routes = Vec::new();
        let mut plugins = Vec::new();
        for module in discover(&dir.join("plugins")) {
            let provider = module
                .manifest
                .get("provider")
                .and_then(Value::as_str)
                .unwrap_or(&module.name)
                .to_string();
            let options = module.manifest.get("options").cloned().unwrap_or(Value::Null);
            let ctx = PluginContext {
                tenant: &id,
                config: &merged,
                host,
                options: &options,
            };
            match host.providers().run_plugin(&provider, &ctx) {
                Ok(outcome) => {
                    routes.extend(outcome.routes);
                    plugins.push(provider);
                }
                Err(e) => tracing::warn!(
                    tenant = %id, module = %module.name, error = %e,
                    "Plugin failed, skipping"
                ),
            }
        }

        for module in discover(&dir.join("routes")) {
            match RouteSpec::from_manifest(&module.name, &module.manifest) {
                Ok(route) => routes.push(route),
                Err(e) => tracing::warn!(
                    tenant = %id, module = %module.name, error = %e,
                    "Route manifest invalid, skipping"
                ),
            }
        }

        Ok(Some(TenantContext {
            id,
            path: dir.to_path_buf(),
            config: merged,
            schemas,
            services,
            routes,
            plugins,
            active: true,
        }))
    }
}

impl Default for TenantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The registry key: the directory name unless `tenant.toml` overrides it.
fn registry_id(dir: &Path, dir_name: &str) -> Result<String, String> {
    let index = dir.join("tenant.toml");
    if !index.exists() {
        return Ok(dir_name.to_string());
    }
    let text = fs::read_to_string(&index).map_err(|e| format!("reading tenant.toml: {e}"))?;
    let parsed: toml::Value =
        toml::from_str(&text).map_err(|e| format!("parsing tenant.toml: {e}"))?;
    Ok(parsed
        .get("id")
        .and_then(toml::Value::as_str)
        .unwrap_or(dir_name)
        .to_string())
}

/// Configuration sources in discovery (lexicographic) order.
///
/// Any `config.*` file in TOML or JSON counts; a parse failure fails the
/// whole tenant load, matching the merge contract.
fn config_sources(dir: &Path) -> Result<Vec<Value>, String> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| e.to_string())?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file() && p.file_stem().and_then(|s| s.to_str()) == Some("config")
        })
        .collect();
    paths.sort();

    let mut sources = Vec::new();
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        let value = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => {
                let parsed: toml::Value =
                    toml::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))?;
                serde_json::to_value(parsed).map_err(|e| e.to_string())?
            }
            Some("json") => serde_json::from_str(&text)
                .map_err(|e| format!("{}: {e}", path.display()))?,
            _ => {
                tracing::debug!(path = ?path, "Unsupported config extension, ignoring");
                continue;
            }
        };
        sources.push(value);
    }
    Ok(sources)
}
