//! The capability module contract.
//!
//! A capability is a process-wide, load-once extension registered against the
//! host. Registration receives the host back-reference plus the options block
//! from `[capabilities.options.<name>]` in the host configuration.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::host::Host;

/// Errors raised by capability registration.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Registration ran but failed; the capability is skipped.
    #[error("registration failed: {0}")]
    Registration(String),

    /// The options block did not have the expected shape.
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

/// A process-wide extension loaded at most once per name.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Stable name the capability is registered and cached under.
    fn name(&self) -> &str;

    /// Register against the host. Runs at most once per process.
    async fn register(&self, host: &Arc<Host>, options: &Value) -> Result<(), CapabilityError>;

    /// Teardown hook, invoked in reverse registration order at shutdown.
    async fn shutdown(&self) {}
}
