//! Tenant lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! tenants root directory
//!     → registry.rs (enumerate, load each tenant sequentially)
//!         → tenant.toml (optional registry key override)
//!         → config.* merged over {id, name, active} defaults
//!         → discovery.rs (schemas/, services/, plugins/, routes/ manifests)
//!         → providers.rs (manifest → instantiated service or plugin)
//!     → TenantContext, registered whole under the tenant id
//!
//! Per request:
//!     resolve.rs derives the tenant id → registry lookup → binding
//!
//! On change (optional):
//!     watcher.rs queues the affected tenant directory for reload
//! ```
//!
//! # Design Decisions
//! - A tenant is registered only when its merged config is active
//! - Reload replaces the whole context atomically; readers never see a
//!   partially built tenant
//! - One bad module or tenant never blocks its siblings

pub mod context;
pub mod discovery;
pub mod providers;
pub mod registry;
pub mod resolve;
pub mod watcher;

pub use context::TenantContext;
pub use registry::TenantRegistry;
