//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! host config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HostConfig (validated, immutable)
//!     → shared via ArcSwap on the Host
//!
//! Per-tenant config sources (config.* in the tenant directory)
//!     → merge.rs (deep merge over {id, name, active} defaults)
//!     → merged tree stored on the TenantContext
//! ```
//!
//! # Design Decisions
//! - Host config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod merge;
pub mod schema;
pub mod validation;

pub use schema::AdminConfig;
pub use schema::HostConfig;
pub use schema::TenancyConfig;
