//! # API Handlers
//!
//! HTTP endpoint handlers for the community console API.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;

use crate::db;
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod alerts;
pub mod auth;
pub mod communities;
pub mod content;
pub mod import;
pub mod principals;
pub mod types;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness and database health probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn health(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    db::health_check(&state.db).await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database unreachable",
        )
    })?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests;
