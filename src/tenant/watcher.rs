//! Tenants directory watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Watches the tenants root and queues changed tenant directories for reload.
pub struct TenantWatcher {
    root: PathBuf,
    reload_tx: mpsc::UnboundedSender<String>,
}

impl TenantWatcher {
    /// Create a new watcher over the tenants root.
    ///
    /// Returns the watcher and a receiver of tenant directory names to reload.
    pub fn new(root: &Path) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        (
            Self {
                root: root.to_path_buf(),
                reload_tx,
            },
            reload_rx,
        )
    }

    /// Start watching in a background thread.
    ///
    /// The returned handle must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.reload_tx.clone();
        let root = self.root.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove())
                    {
                        return;
                    }
                    for path in &event.paths {
                        if let Some(dir) = tenant_dir_for(&root, path) {
                            tracing::info!(tenant = %dir, "Tenant change detected, queueing reload");
                            let _ = tx.send(dir);
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        tracing::info!(root = ?self.root, "Tenant watcher started");
        Ok(watcher)
    }
}

/// Map a changed path to the top-level tenant directory it belongs to.
fn tenant_dir_for(root: &Path, changed: &Path) -> Option<String> {
    let relative = changed.strip_prefix(root).ok()?;
    let first = relative.components().next()?;
    let name = first.as_os_str().to_str()?;
    if name.starts_with('.') {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_dir_for() {
        let root = Path::new("/srv/tenants");
        assert_eq!(
            tenant_dir_for(root, Path::new("/srv/tenants/acme/config.toml")),
            Some("acme".to_string())
        );
        assert_eq!(
            tenant_dir_for(root, Path::new("/srv/tenants/acme/services/kv.toml")),
            Some("acme".to_string())
        );
        assert_eq!(tenant_dir_for(root, Path::new("/srv/tenants/.tmp123")), None);
        assert_eq!(tenant_dir_for(root, Path::new("/elsewhere/file")), None);
        assert_eq!(tenant_dir_for(root, root), None);
    }
}
