//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, tenant binding)
//! - Serve the protected tenant API and tenant-prefixed routes
//! - Run with graceful shutdown driven by the coordinator
//!
//! # Design Decisions
//! - The protected prefix is nested at build time from configuration
//! - Handlers only read registry state; nothing on the request path
//!   touches the filesystem

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::HostConfig;
use crate::host::Host;
use crate::http::middleware::tenant::{tenant_middleware, TenantBinding};
use crate::http::request::RequestIdLayer;
use crate::http::response::{error_response, success_response};
use crate::tenant::context::RouteAction;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub host: Arc<Host>,
}

/// HTTP server for the tenant host.
pub struct HttpServer {
    router: Router,
    host: Arc<Host>,
}

impl HttpServer {
    /// Create a new HTTP server over a fully loaded host.
    pub fn new(host: Arc<Host>) -> Self {
        let state = AppState { host: host.clone() };
        let router = Self::build_router(&host.config(), state);
        Self { router, host }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &HostConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/tenant", get(tenant_summary))
            .route("/schemas", get(tenant_schemas))
            .route("/services", get(tenant_services))
            .route("/services/{name}", post(invoke_service));

        Router::new()
            .route("/healthz", get(health))
            .nest(&config.tenancy.protected_prefix, api)
            .fallback(tenant_route_handler)
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(state, tenant_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let host = self.host.clone();
        let mut shutdown_rx = host.shutdown().subscribe();

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                if host.shutdown().is_triggered() {
                    return;
                }
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tenants": state.host.tenants().len(),
    }))
}

/// Summary of the resolved tenant.
async fn tenant_summary(Extension(binding): Extension<TenantBinding>) -> Json<Value> {
    let context = &binding.context;
    Json(json!({
        "success": true,
        "tenant": {
            "id": context.id,
            "active": context.active,
            "schemas": context.schemas.len(),
            "services": context.services.len(),
            "routes": context.routes.len(),
            "plugins": context.plugins,
        },
        "config": context.config,
    }))
}

async fn tenant_schemas(Extension(binding): Extension<TenantBinding>) -> Json<Value> {
    Json(json!({
        "success": true,
        "schemas": binding.context.schemas,
    }))
}

async fn tenant_services(Extension(binding): Extension<TenantBinding>) -> Json<Value> {
    let services: serde_json::Map<String, Value> = binding
        .context
        .services
        .iter()
        .map(|(name, instance)| {
            (
                name.clone(),
                json!({
                    "provider": instance.provider(),
                    "kind": instance.kind().as_str(),
                }),
            )
        })
        .collect();
    Json(json!({"success": true, "services": services}))
}

/// Invoke a discovered service with the request body as input.
async fn invoke_service(
    Extension(binding): Extension<TenantBinding>,
    Path(name): Path<String>,
    Json(input): Json<Value>,
) -> Response {
    match binding.context.services.get(&name) {
        Some(instance) => match instance.invoke(&input) {
            Ok(result) => success_response(result),
            Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => error_response(StatusCode::NOT_FOUND, format!("Service '{name}' not found")),
    }
}

/// Serve tenant routes mounted under `/<tenant-id>`.
async fn tenant_route_handler(req: Request<Body>) -> Response {
    let Some(binding) = req.extensions().get::<TenantBinding>().cloned() else {
        return error_response(StatusCode::NOT_FOUND, format!("No route for '{}'", req.uri().path()));
    };

    let path = req.uri().path();
    let prefix = format!("/{}", binding.id);
    let remainder = match path.strip_prefix(&prefix) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => return error_response(StatusCode::NOT_FOUND, format!("No route for '{path}'")),
    };

    match binding.context.find_route(req.method().as_str(), remainder) {
        Some(route) => match &route.action {
            RouteAction::Static(body) => Json(body.clone()).into_response(),
            RouteAction::Service { service } => match binding.context.services.get(service) {
                Some(instance) => match instance.invoke(&Value::Null) {
                    Ok(result) => success_response(result),
                    Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
                },
                None => error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Route references unknown service '{service}'"),
                ),
            },
        },
        None => error_response(StatusCode::NOT_FOUND, format!("No route for '{path}'")),
    }
}
