//! Capability loading subsystem.
//!
//! # Data Flow
//! ```text
//! [capabilities].order in host config
//!     → loader.rs (load each name once, in order)
//!     → catalog.rs (name → implementation lookup)
//!     → Capability::register(host, options)
//!     → cached handle, reused for the life of the process
//!
//! On shutdown:
//!     loader.shutdown_all() → Capability::shutdown, reverse order
//! ```
//!
//! # Design Decisions
//! - Registration is idempotent per name: the side effect runs once
//! - A missing or failing capability is skipped, never fatal
//! - Startup order comes from configuration, not directory enumeration

pub mod builtin;
pub mod catalog;
pub mod contract;
pub mod loader;

pub use catalog::CapabilityCatalog;
pub use contract::{Capability, CapabilityError};
pub use loader::CapabilityLoader;
