//! Module discovery and classification.
//!
//! # Responsibilities
//! - Enumerate `*.toml` manifests recursively under a directory
//! - Derive each module's name from its file stem
//! - Classify modules as constructor, factory, or static value
//!
//! # Design Decisions
//! - Enumeration is lexicographic per directory level, so discovery order
//!   is deterministic across filesystems
//! - A manifest that fails to read or parse is logged and skipped; it never
//!   aborts discovery of the remaining modules
//! - Classification prefers what a manifest or provider declares; the
//!   uppercase-name heuristic survives only as a compatibility fallback

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// How a discovered module is instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Built through a named constructor provider.
    Constructor,
    /// Built by invoking a named factory provider.
    Factory,
    /// An inline value used verbatim.
    Value,
}

impl ModuleKind {
    /// Parse the manifest spelling of a kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "constructor" => Some(Self::Constructor),
            "factory" => Some(Self::Factory),
            "value" => Some(Self::Value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constructor => "constructor",
            Self::Factory => "factory",
            Self::Value => "value",
        }
    }
}

/// A manifest found under a tenant subdirectory.
#[derive(Debug, Clone)]
pub struct DiscoveredModule {
    /// Name derived from the file stem.
    pub name: String,
    /// Where the manifest was found.
    pub path: PathBuf,
    /// The parsed manifest, normalized to a JSON tree.
    pub manifest: Value,
}

/// Enumerate every `*.toml` manifest under `dir`, recursively.
///
/// Returns an empty list when the directory does not exist. Unreadable or
/// unparsable files are logged and skipped.
pub fn discover(dir: &Path) -> Vec<DiscoveredModule> {
    let mut modules = Vec::new();
    if dir.is_dir() {
        walk(dir, &mut modules);
    }
    modules
}

fn walk(dir: &Path, modules: &mut Vec<DiscoveredModule>) {
    let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(read) => read.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(e) => {
            tracing::warn!(directory = ?dir, error = %e, "Failed to read module directory");
            return;
        }
    };
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk(&path, modules);
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match load_manifest(&path) {
            Ok(manifest) => modules.push(DiscoveredModule {
                name: name.to_string(),
                path: path.clone(),
                manifest,
            }),
            Err(e) => {
                tracing::warn!(module = %name, path = ?path, error = %e, "Failed to load module manifest, skipping");
            }
        }
    }
}

fn load_manifest(path: &Path) -> Result<Value, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let parsed: toml::Value = toml::from_str(&text).map_err(|e| e.to_string())?;
    serde_json::to_value(parsed).map_err(|e| e.to_string())
}

/// Decide how a module should be instantiated.
///
/// Precedence: an explicit `kind` field in the manifest, then an inline
/// `value` table, then the kind the provider declared at registration, and
/// finally the naming heuristic (leading uppercase means constructor).
/// Returns `None` when the manifest declares an unknown kind.
pub fn classify(
    manifest: &Value,
    declared: Option<ModuleKind>,
    provider_name: &str,
) -> Option<ModuleKind> {
    if let Some(kind) = manifest.get("kind").and_then(Value::as_str) {
        return ModuleKind::parse(kind);
    }
    if manifest.get("value").is_some() {
        return Some(ModuleKind::Value);
    }
    if let Some(kind) = declared {
        return Some(kind);
    }
    Some(name_heuristic(provider_name))
}

/// The legacy naming convention: uppercase-led names construct, the rest
/// are called as factories.
fn name_heuristic(name: &str) -> ModuleKind {
    if name.chars().next().is_some_and(char::is_uppercase) {
        ModuleKind::Constructor
    } else {
        ModuleKind::Factory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_discovery_is_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("zeta.toml"), "provider = \"echo\"").unwrap();
        fs::write(dir.path().join("alpha.toml"), "provider = \"echo\"").unwrap();
        fs::write(dir.path().join("nested/inner.toml"), "provider = \"echo\"").unwrap();
        fs::write(dir.path().join("ignored.txt"), "not a manifest").unwrap();

        let modules = discover(dir.path());
        let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "inner", "zeta"]);
    }

    #[test]
    fn test_bad_manifest_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.toml"), "= not toml =").unwrap();
        fs::write(dir.path().join("good.toml"), "provider = \"echo\"").unwrap();

        let modules = discover(dir.path());
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "good");
        assert_eq!(modules[0].manifest["provider"], json!("echo"));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        assert!(discover(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_classification_precedence() {
        // Explicit kind beats everything.
        let explicit = json!({"kind": "factory", "provider": "Pricing"});
        assert_eq!(
            classify(&explicit, Some(ModuleKind::Constructor), "Pricing"),
            Some(ModuleKind::Factory)
        );

        // Inline value table classifies as a static value.
        let inline = json!({"value": {"plan": "gold"}});
        assert_eq!(classify(&inline, None, "whatever"), Some(ModuleKind::Value));

        // The provider's declared kind comes next.
        let plain = json!({"provider": "counter"});
        assert_eq!(
            classify(&plain, Some(ModuleKind::Factory), "counter"),
            Some(ModuleKind::Factory)
        );

        // Unknown explicit kinds are rejected.
        let unknown = json!({"kind": "singleton"});
        assert_eq!(classify(&unknown, None, "x"), None);
    }

    #[test]
    fn test_name_heuristic_fallback() {
        let plain = json!({});
        assert_eq!(classify(&plain, None, "Pricing"), Some(ModuleKind::Constructor));
        assert_eq!(classify(&plain, None, "pricing"), Some(ModuleKind::Factory));
    }
}
