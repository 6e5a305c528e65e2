//! # Resident Import Handler
//!
//! Admin endpoint accepting a parsed spreadsheet of resident rows and
//! applying it through the batch importer.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{CurrentPrincipal, PageArea, enforce_area};
use crate::error::ApiError;
use crate::handlers::communities::require_community_scope;
use crate::handlers::types::ApiResponse;
use crate::import::{self, ImportReport, ImportRow};
use crate::server::AppState;

/// Request payload for a bulk resident import
#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportRequestDto {
    pub rows: Vec<ImportRow>,
}

/// Import residents into a community
///
/// Rows are applied independently; the report lists every row that could
/// not be imported. Re-running the same import is safe.
#[utoipa::path(
    post,
    path = "/api/v1/communities/{slug}/residents/import",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    request_body = ImportRequestDto,
    responses(
        (status = 200, description = "Import report", body = ApiResponse<ImportReport>),
        (status = 400, description = "Import exceeds the row limit", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "import"
)]
pub async fn import_residents(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
    Json(request): Json<ImportRequestDto>,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;
    require_community_scope(&principal, &slug, &state.config.default_community_slug)?;

    let report = import::run_import(&state.db, &state.config.import, &slug, request.rows).await?;

    Ok(Json(ApiResponse::new(report)))
}
