//! Tenant resolution middleware.
//!
//! Runs once per inbound request, before route handling. Derives the tenant
//! id, binds the matching context onto the request, and rejects protected
//! paths that resolve to no tenant. This is the only mandatory per-request
//! work in the core: one registry lookup, O(1) in the registry size.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::http::request::RequestIdExt;
use crate::http::response::error_response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::tenant::resolve::derive_tenant_id;
use crate::tenant::TenantContext;

/// The per-request tenant binding, stored in request extensions.
#[derive(Clone)]
pub struct TenantBinding {
    pub id: String,
    pub context: Arc<TenantContext>,
}

/// Resolve the request to a tenant and attach the binding.
///
/// A protected path with no resolved tenant short-circuits with a 404 and
/// the structured error payload; anything else passes through unchanged.
pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let config = state.host.config();

    let host_header = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok());
    let header_value = req
        .headers()
        .get(config.tenancy.tenant_header.as_str())
        .and_then(|h| h.to_str().ok());
    let path = req.uri().path().to_string();
    let method = req.method().to_string();
    let request_id = req.request_id().unwrap_or("unknown").to_string();

    let tenant_id = derive_tenant_id(
        host_header,
        &path,
        header_value,
        &config.tenancy.protected_prefix,
        &config.tenancy.fallback_id,
    );

    let resolved = match state.host.tenants().get_context(&tenant_id) {
        Some(context) => {
            req.extensions_mut().insert(TenantBinding {
                id: tenant_id.clone(),
                context,
            });
            true
        }
        None if is_protected(&path, &config.tenancy.protected_prefix) => {
            tracing::debug!(
                request_id = %request_id,
                tenant = %tenant_id,
                path = %path,
                "Protected path with unresolved tenant"
            );
            let response =
                error_response(StatusCode::NOT_FOUND, format!("Tenant '{tenant_id}' not found"));
            record(&state, &method, &path, response.status().as_u16(), "none", start);
            return response;
        }
        None => false,
    };

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        tenant = %tenant_id,
        method = %method,
        path = %path,
    );
    let response = next.run(req).instrument(span).await;

    let tenant_label = if resolved { tenant_id.as_str() } else { "none" };
    record(&state, &method, &path, response.status().as_u16(), tenant_label, start);
    response
}

fn is_protected(path: &str, prefix: &str) -> bool {
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

fn record(state: &AppState, method: &str, path: &str, status: u16, tenant: &str, start: Instant) {
    if let Some(log) = state.host.access_log() {
        log.record(method, path, status, tenant);
    }
    metrics::record_request(method, status, tenant, start);
}
