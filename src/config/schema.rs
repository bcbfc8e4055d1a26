//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the host.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for the tenant host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Tenant resolution and discovery settings.
    pub tenancy: TenancyConfig,

    /// Core capability loading settings.
    pub capabilities: CapabilitiesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Tenant resolution and discovery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Root directory holding one subdirectory per tenant.
    pub root: String,

    /// Header carrying an explicit tenant identifier.
    pub tenant_header: String,

    /// Identifier used when no derivation rule matches.
    pub fallback_id: String,

    /// Path prefix that requires a resolved tenant.
    pub protected_prefix: String,

    /// Watch the tenants root and reload changed tenants.
    pub watch: bool,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            root: "tenants".to_string(),
            tenant_header: "x-tenant-id".to_string(),
            fallback_id: "default-tenant".to_string(),
            protected_prefix: "/api".to_string(),
            watch: false,
        }
    }
}

/// Core capability loading settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CapabilitiesConfig {
    /// Capability names loaded at startup, in this exact order.
    pub order: Vec<String>,

    /// Per-capability options, keyed by capability name.
    pub options: HashMap<String, serde_json::Value>,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            order: vec!["storage".to_string(), "access-log".to_string()],
            options: HashMap::new(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API listener.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.tenancy.fallback_id, "default-tenant");
        assert_eq!(config.tenancy.protected_prefix, "/api");
        assert_eq!(config.capabilities.order, vec!["storage", "access-log"]);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_minimal_config_parses() {
        let config: HostConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [capabilities.options.storage]
            persist_path = "/tmp/storage.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(
            config.capabilities.options["storage"]["persist_path"],
            serde_json::json!("/tmp/storage.json")
        );
    }
}
