//! Compile-time capability registration.
//!
//! # Responsibilities
//! - Map capability names to their implementations
//! - Ship the built-in capability set
//!
//! # Design Decisions
//! - Capabilities are registered in code, not imported from arbitrary
//!   filesystem paths; an unknown name is a non-fatal lookup miss
//! - The catalog is immutable once the host is constructed

use std::collections::HashMap;
use std::sync::Arc;

use crate::capability::builtin::{AccessLogCapability, StorageCapability};
use crate::capability::contract::Capability;

/// Registry of known capability implementations, keyed by name.
pub struct CapabilityCatalog {
    entries: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Catalog with the built-in capability set.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(Arc::new(StorageCapability::new()));
        catalog.register(Arc::new(AccessLogCapability::new()));
        catalog
    }

    /// Register a capability under its own name, replacing any previous entry.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.entries
            .insert(capability.name().to_string(), capability);
    }

    /// Look up a capability by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries.get(name).cloned()
    }

    /// Names known to this catalog, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for CapabilityCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_contents() {
        let catalog = CapabilityCatalog::builtin();
        assert_eq!(catalog.names(), vec!["access-log", "storage"]);
        assert!(catalog.get("storage").is_some());
        assert!(catalog.get("missing").is_none());
    }
}
