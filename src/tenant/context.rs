//! Per-tenant state.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::tenant::providers::ServiceInstance;

/// Everything the host knows about one registered tenant.
///
/// Built whole by a successful load and shared as an `Arc`; a reload swaps
/// the registry entry for a freshly built context, never mutates this one.
pub struct TenantContext {
    /// Registry key (directory name unless `tenant.toml` overrides it).
    pub id: String,
    /// The tenant's source directory.
    pub path: PathBuf,
    /// Deep-merged configuration tree.
    pub config: Value,
    /// Discovered schema definitions, keyed by their declared id.
    pub schemas: BTreeMap<String, Value>,
    /// Discovered services, keyed by module name.
    pub services: BTreeMap<String, ServiceInstance>,
    /// Routes mounted under `/<tenant-id>`, discovered plus plugin-contributed.
    pub routes: Vec<RouteSpec>,
    /// Names of the plugins applied during load.
    pub plugins: Vec<String>,
    /// Always true for registered tenants; inactive tenants are never registered.
    pub active: bool,
}

impl TenantContext {
    /// Find a route by method and tenant-relative path.
    pub fn find_route(&self, method: &str, path: &str) -> Option<&RouteSpec> {
        self.routes
            .iter()
            .find(|r| r.path == path && r.method.eq_ignore_ascii_case(method))
    }
}

/// One route a tenant exposes under its prefix.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    /// Module name the route came from.
    pub name: String,
    /// Uppercased HTTP method.
    pub method: String,
    /// Tenant-relative path, always starting with `/`.
    pub path: String,
    pub action: RouteAction,
}

/// What a matched route responds with.
#[derive(Debug, Clone)]
pub enum RouteAction {
    /// A fixed JSON body.
    Static(Value),
    /// Invoke one of the tenant's services.
    Service { service: String },
}

impl RouteSpec {
    /// Build a route from a discovered manifest.
    pub fn from_manifest(name: &str, manifest: &Value) -> Result<Self, String> {
        let path = manifest
            .get("path")
            .and_then(Value::as_str)
            .ok_or("route manifest missing 'path'")?;
        if !path.starts_with('/') {
            return Err(format!("route path '{path}' must start with '/'"));
        }

        let method = manifest
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();

        let action = manifest.get("action").ok_or("route manifest missing 'action'")?;
        let action = match action.get("kind").and_then(Value::as_str).unwrap_or("static") {
            "static" => RouteAction::Static(action.get("body").cloned().unwrap_or(Value::Null)),
            "service" => RouteAction::Service {
                service: action
                    .get("service")
                    .and_then(Value::as_str)
                    .ok_or("service action missing 'service'")?
                    .to_string(),
            },
            other => return Err(format!("unknown route action kind '{other}'")),
        };

        Ok(Self {
            name: name.to_string(),
            method,
            path: path.to_string(),
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_static_route_from_manifest() {
        let manifest = json!({
            "path": "/plans",
            "action": {"kind": "static", "body": {"plans": ["gold"]}}
        });
        let route = RouteSpec::from_manifest("plans", &manifest).unwrap();
        assert_eq!(route.method, "GET");
        assert_eq!(route.path, "/plans");
        assert!(matches!(route.action, RouteAction::Static(_)));
    }

    #[test]
    fn test_service_route_from_manifest() {
        let manifest = json!({
            "path": "/hits",
            "method": "post",
            "action": {"kind": "service", "service": "counter"}
        });
        let route = RouteSpec::from_manifest("hits", &manifest).unwrap();
        assert_eq!(route.method, "POST");
        match route.action {
            RouteAction::Service { service } => assert_eq!(service, "counter"),
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_route_manifests() {
        assert!(RouteSpec::from_manifest("r", &json!({})).is_err());
        assert!(RouteSpec::from_manifest("r", &json!({"path": "no-slash", "action": {}})).is_err());
        assert!(RouteSpec::from_manifest(
            "r",
            &json!({"path": "/x", "action": {"kind": "teleport"}})
        )
        .is_err());
        assert!(RouteSpec::from_manifest(
            "r",
            &json!({"path": "/x", "action": {"kind": "service"}})
        )
        .is_err());
    }
}
