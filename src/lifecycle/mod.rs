//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build host → Load capabilities in order →
//!     Load tenants → Start background tasks → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger received → Stop accepting → Drain capabilities → Done
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT/panic → ShutdownCoordinator::trigger
//! ```
//!
//! # Design Decisions
//! - Ordered startup: capabilities first, then tenants, listeners last
//! - Teardown runs exactly once no matter how many triggers race
//! - Capabilities close in reverse registration order

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::ShutdownCoordinator;
