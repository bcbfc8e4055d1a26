//! Multi-tenant capability host.
//!
//! Hosts independent tenants inside one process: requests resolve to a
//! tenant, named core capabilities load once in a declared order, and each
//! tenant's configuration, schemas, services, plugins, and routes are
//! discovered from a directory convention. One tenant's or module's failure
//! never aborts another's.

pub mod admin;
pub mod capability;
pub mod config;
pub mod host;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod tenant;

pub use config::HostConfig;
pub use host::Host;
pub use http::HttpServer;
pub use lifecycle::ShutdownCoordinator;
