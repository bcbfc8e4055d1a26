//! Admin API on its own listener.
//!
//! Bearer-key authenticated surface for operators: status, tenant and
//! capability listings, and on-demand tenant reload.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::host::Host;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/tenants", get(get_tenants))
        .route("/admin/capabilities", get(get_capabilities))
        .route("/admin/tenants/{dir}/reload", post(reload_tenant))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}

/// Serve the admin API until shutdown triggers.
pub async fn run_admin(host: Arc<Host>, listener: TcpListener) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    let state = AppState { host: host.clone() };
    let router = setup_admin_router(state);

    let mut shutdown_rx = host.shutdown().subscribe();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if host.shutdown().is_triggered() {
                return;
            }
            let _ = shutdown_rx.recv().await;
        })
        .await
}
