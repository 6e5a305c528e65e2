//! # Emergency Alert Handlers
//!
//! Residents raise alerts from the front pages; community admins work them
//! through a forward-only workflow (active, acknowledged, resolved).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentPrincipal, PageArea, enforce_area};
use crate::error::ApiError;
use crate::handlers::communities::require_community_scope;
use crate::handlers::types::ApiResponse;
use crate::models::alert::{AlertStatus, Model as AlertModel};
use crate::repositories::AlertRepository;
use crate::repositories::alert::CreateAlertRequest;
use crate::server::AppState;

/// Request payload for raising an alert
#[derive(Debug, Deserialize, ToSchema)]
pub struct RaiseAlertDto {
    /// Unit or address the alert concerns
    #[schema(example = "A棟 3F-1")]
    pub unit: String,
}

/// Public view of an alert
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AlertDto {
    pub id: String,
    pub community_slug: String,
    pub unit: String,
    pub submitter_name: Option<String>,
    pub submitter_phone: Option<String>,
    #[schema(example = "active")]
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&AlertModel> for AlertDto {
    fn from(model: &AlertModel) -> Self {
        Self {
            id: model.id.to_string(),
            community_slug: model.community_slug.clone(),
            unit: model.unit.clone(),
            submitter_name: model.submitter_name.clone(),
            submitter_phone: model.submitter_phone.clone(),
            status: model.status.clone(),
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Raise an emergency alert
#[utoipa::path(
    post,
    path = "/api/v1/alerts",
    security(("bearer_auth" = [])),
    request_body = RaiseAlertDto,
    responses(
        (status = 201, description = "Alert raised", body = ApiResponse<AlertDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "alerts"
)]
pub async fn raise_alert(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Json(request): Json<RaiseAlertDto>,
) -> Result<(StatusCode, Json<ApiResponse<AlertDto>>), ApiError> {
    enforce_area(&state, &principal, PageArea::Front).await?;

    let community_slug = principal
        .community_slug
        .clone()
        .unwrap_or_else(|| state.config.default_community_slug.clone());

    let alert = AlertRepository::new(&state.db)
        .create(CreateAlertRequest {
            community_slug: community_slug.clone(),
            unit: request.unit,
            submitter_id: principal.id,
            submitter_name: principal.display_name.clone(),
            submitter_phone: principal.phone.clone(),
        })
        .await?;

    tracing::warn!(
        alert_id = %alert.id,
        community_slug,
        submitter_id = %principal.id,
        "Emergency alert raised"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(AlertDto::from(&alert))),
    ))
}

/// List a community's alerts, newest first
#[utoipa::path(
    get,
    path = "/api/v1/communities/{slug}/alerts",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    responses(
        (status = 200, description = "Alerts of the community", body = ApiResponse<Vec<AlertDto>>),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "alerts"
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<AlertDto>>>, ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;
    require_community_scope(&principal, &slug, &state.config.default_community_slug)?;

    let alerts = AlertRepository::new(&state.db)
        .list_by_community(&slug)
        .await?;
    let dtos: Vec<AlertDto> = alerts.iter().map(AlertDto::from).collect();

    Ok(Json(ApiResponse::new(dtos)))
}

/// Acknowledge an alert
#[utoipa::path(
    post,
    path = "/api/v1/alerts/{id}/acknowledge",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Alert UUID")),
    responses(
        (status = 200, description = "Acknowledged alert", body = ApiResponse<AlertDto>),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Alert not found", body = ApiError),
        (status = 409, description = "Alert cannot move backwards", body = ApiError)
    ),
    tag = "alerts"
)]
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AlertDto>>, ApiError> {
    transition_alert(state, principal, id, AlertStatus::Acknowledged).await
}

/// Resolve an alert
#[utoipa::path(
    post,
    path = "/api/v1/alerts/{id}/resolve",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Alert UUID")),
    responses(
        (status = 200, description = "Resolved alert", body = ApiResponse<AlertDto>),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Alert not found", body = ApiError),
        (status = 409, description = "Alert cannot move backwards", body = ApiError)
    ),
    tag = "alerts"
)]
pub async fn resolve_alert(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AlertDto>>, ApiError> {
    transition_alert(state, principal, id, AlertStatus::Resolved).await
}

async fn transition_alert(
    state: AppState,
    principal: CurrentPrincipal,
    id: Uuid,
    next: AlertStatus,
) -> Result<Json<ApiResponse<AlertDto>>, ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;

    let repo = AlertRepository::new(&state.db);
    let alert = repo.find_by_id(id).await?.ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Alert not found")
    })?;

    require_community_scope(
        &principal,
        &alert.community_slug,
        &state.config.default_community_slug,
    )?;

    let updated = repo.transition(id, next).await?;

    tracing::info!(
        alert_id = %id,
        status = next.as_str(),
        by = %principal.id,
        "Alert status changed"
    );

    Ok(Json(ApiResponse::new(AlertDto::from(&updated))))
}
