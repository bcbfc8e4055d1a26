use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::Serialize;

use crate::http::response::error_response;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub tenants: usize,
    pub capabilities: Vec<String>,
    pub requests: u64,
}

#[derive(Serialize)]
pub struct TenantSummary {
    pub id: String,
    pub schemas: usize,
    pub services: usize,
    pub routes: usize,
    pub plugins: Vec<String>,
}

#[derive(Serialize)]
pub struct ReloadOutcome {
    pub success: bool,
    pub tenant: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        tenants: state.host.tenants().len(),
        capabilities: state.host.capabilities().loaded_names(),
        requests: state.host.access_log().map(|log| log.total()).unwrap_or(0),
    })
}

pub async fn get_tenants(State(state): State<AppState>) -> Json<Vec<TenantSummary>> {
    let registry = state.host.tenants();
    let summaries = registry
        .list_tenants()
        .into_iter()
        .filter_map(|id| registry.get_context(&id))
        .map(|context| TenantSummary {
            id: context.id.clone(),
            schemas: context.schemas.len(),
            services: context.services.len(),
            routes: context.routes.len(),
            plugins: context.plugins.clone(),
        })
        .collect();
    Json(summaries)
}

pub async fn get_capabilities(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.host.capabilities().loaded_names())
}

pub async fn reload_tenant(
    State(state): State<AppState>,
    Path(dir): Path<String>,
) -> Result<Json<ReloadOutcome>, Response> {
    if state.host.load_tenant(&dir) {
        Ok(Json(ReloadOutcome {
            success: true,
            tenant: dir,
        }))
    } else {
        Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Tenant '{dir}' could not be loaded"),
        ))
    }
}
