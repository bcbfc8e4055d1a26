//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, routing, layers)
//!     → request.rs (request ID generation)
//!     → middleware/tenant.rs (tenant resolution and binding)
//!     → protected tenant API or tenant-prefixed routes
//!     → response.rs (structured success/error payloads)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::HttpServer;
