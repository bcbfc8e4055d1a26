//! Request-path middleware.

pub mod tenant;

pub use tenant::{tenant_middleware, TenantBinding};
