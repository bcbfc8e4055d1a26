//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and path prefixes
//! - Detect duplicate capability order entries
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HostConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::HostConfig;

/// A single semantic validation failure.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("tenancy.protected_prefix must start with '/' (got '{0}')")]
    BadProtectedPrefix(String),

    #[error("tenancy.fallback_id must not be empty")]
    EmptyFallbackId,

    #[error("tenancy.tenant_header must not be empty")]
    EmptyTenantHeader,

    #[error("capabilities.order lists '{0}' more than once")]
    DuplicateCapability(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &HostConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if !config.tenancy.protected_prefix.starts_with('/') {
        errors.push(ValidationError::BadProtectedPrefix(
            config.tenancy.protected_prefix.clone(),
        ));
    }
    if config.tenancy.fallback_id.trim().is_empty() {
        errors.push(ValidationError::EmptyFallbackId);
    }
    if config.tenancy.tenant_header.trim().is_empty() {
        errors.push(ValidationError::EmptyTenantHeader);
    }

    let mut seen = std::collections::HashSet::new();
    for name in &config.capabilities.order {
        if !seen.insert(name.as_str()) {
            errors.push(ValidationError::DuplicateCapability(name.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
