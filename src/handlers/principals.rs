//! # Principal Management Handlers
//!
//! Admin-console endpoints for managing resident and administrator accounts.
//! Accounts are never hard-deleted by another account: "removal" disables the
//! account and revokes its sessions so audit history stays intact.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{
    AccountStatus, CurrentPrincipal, PageArea, Role, enforce_area, hash_password,
};
use crate::error::{ApiError, forbidden};
use crate::handlers::communities::require_community_scope;
use crate::handlers::types::{ApiResponse, PrincipalDto};
use crate::repositories::principal::CreatePrincipalRequest;
use crate::repositories::{PrincipalRepository, SessionRepository};
use crate::server::AppState;

/// Request payload for an admin creating an account
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateManagedPrincipalDto {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    /// Defaults to resident; only system administrators may grant more
    pub role: Option<Role>,
    pub household: Option<serde_json::Value>,
}

/// Request payload for updating a managed account
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateManagedPrincipalDto {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    /// Move the account to another community (system administrators only)
    pub community_slug: Option<String>,
}

/// Query parameters for listing community principals
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListPrincipalsQuery {
    /// Role filter, defaults to resident
    pub role: Option<Role>,
}

/// List the principals of a community
#[utoipa::path(
    get,
    path = "/api/v1/communities/{slug}/principals",
    security(("bearer_auth" = [])),
    params(
        ("slug" = String, Path, description = "Community slug"),
        ("role" = Option<Role>, Query, description = "Role filter, defaults to resident")
    ),
    responses(
        (status = 200, description = "Principals of the community", body = ApiResponse<Vec<PrincipalDto>>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "principals"
)]
pub async fn list_principals(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
    Query(query): Query<ListPrincipalsQuery>,
) -> Result<Json<ApiResponse<Vec<PrincipalDto>>>, ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;
    require_community_scope(&principal, &slug, &state.config.default_community_slug)?;

    let role = query.role.unwrap_or(Role::Resident);
    let principals = PrincipalRepository::new(&state.db)
        .list_by_community(&slug, role)
        .await?;

    let dtos: Vec<PrincipalDto> = principals.iter().map(PrincipalDto::from).collect();
    Ok(Json(ApiResponse::new(dtos)))
}

/// List administrator accounts across all communities
#[utoipa::path(
    get,
    path = "/api/v1/admins",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All administrator accounts", body = ApiResponse<Vec<PrincipalDto>>),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "principals"
)]
pub async fn list_admins(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> Result<Json<ApiResponse<Vec<PrincipalDto>>>, ApiError> {
    enforce_area(&state, &principal, PageArea::System).await?;

    let admins = PrincipalRepository::new(&state.db).list_admins().await?;
    let dtos: Vec<PrincipalDto> = admins.iter().map(PrincipalDto::from).collect();
    Ok(Json(ApiResponse::new(dtos)))
}

/// Create an account in a community
#[utoipa::path(
    post,
    path = "/api/v1/communities/{slug}/principals",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    request_body = CreateManagedPrincipalDto,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<PrincipalDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "principals"
)]
pub async fn create_principal(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
    Json(request): Json<CreateManagedPrincipalDto>,
) -> Result<(StatusCode, Json<ApiResponse<PrincipalDto>>), ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;
    require_community_scope(&principal, &slug, &state.config.default_community_slug)?;

    let role = request.role.unwrap_or(Role::Resident);
    if role != Role::Resident && principal.role != Role::SystemAdmin {
        return Err(forbidden(Some(
            "Only system administrators may grant administrator roles",
        )));
    }

    let password_hash = hash_password(&request.password)?;

    let created = PrincipalRepository::new(&state.db)
        .create(CreatePrincipalRequest {
            email: request.email,
            password_hash,
            display_name: request.display_name,
            phone: request.phone,
            photo_url: None,
            role,
            community_slug: Some(slug.clone()),
            household: request.household,
        })
        .await?;

    tracing::info!(
        principal_id = %created.id,
        community_slug = slug,
        role = role.as_str(),
        created_by = %principal.id,
        "Account created by administrator"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(PrincipalDto::from(&created))),
    ))
}

/// Update a managed account's role, status or community
#[utoipa::path(
    patch,
    path = "/api/v1/principals/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Principal UUID")),
    request_body = UpdateManagedPrincipalDto,
    responses(
        (status = 200, description = "Updated account", body = ApiResponse<PrincipalDto>),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Account not found", body = ApiError)
    ),
    tag = "principals"
)]
pub async fn update_principal(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateManagedPrincipalDto>,
) -> Result<Json<ApiResponse<PrincipalDto>>, ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;

    let repo = PrincipalRepository::new(&state.db);
    let mut target = repo.find_by_id(id).await?.ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Account not found")
    })?;

    let target_slug = target
        .community_slug
        .clone()
        .unwrap_or_else(|| state.config.default_community_slug.clone());
    require_community_scope(&principal, &target_slug, &state.config.default_community_slug)?;

    if let Some(role) = request.role {
        // Role grants wider than resident are a system-console operation.
        if principal.role != Role::SystemAdmin {
            return Err(forbidden(Some(
                "Only system administrators may change roles",
            )));
        }
        target = repo.set_role(id, role).await?;
    }

    if let Some(community_slug) = request.community_slug {
        if principal.role != Role::SystemAdmin {
            return Err(forbidden(Some(
                "Only system administrators may move accounts between communities",
            )));
        }
        target = repo.set_community(id, Some(community_slug)).await?;
    }

    if let Some(status) = request.status {
        target = repo.set_status(id, status).await?;
        if status == AccountStatus::Disabled {
            let revoked = SessionRepository::new(&state.db)
                .revoke_for_principal(id)
                .await?;
            tracing::info!(
                principal_id = %id,
                revoked_sessions = revoked,
                "Account disabled; sessions revoked"
            );
        }
    }

    Ok(Json(ApiResponse::new(PrincipalDto::from(&target))))
}

/// Remove an account
///
/// Removing another account disables it and revokes its sessions; the record
/// is kept. Removing your own account additionally signs you out everywhere.
#[utoipa::path(
    delete,
    path = "/api/v1/principals/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Principal UUID")),
    responses(
        (status = 204, description = "Account disabled and signed out"),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Account not found", body = ApiError)
    ),
    tag = "principals"
)]
pub async fn remove_principal(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = PrincipalRepository::new(&state.db);
    let target = repo.find_by_id(id).await?.ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Account not found")
    })?;

    if id != principal.id {
        // Removing someone else is an admin operation scoped to their community.
        enforce_area(&state, &principal, PageArea::Admin).await?;
        let target_slug = target
            .community_slug
            .clone()
            .unwrap_or_else(|| state.config.default_community_slug.clone());
        require_community_scope(&principal, &target_slug, &state.config.default_community_slug)?;
    }

    repo.set_status(id, AccountStatus::Disabled).await?;
    let revoked = SessionRepository::new(&state.db)
        .revoke_for_principal(id)
        .await?;

    tracing::info!(
        principal_id = %id,
        removed_by = %principal.id,
        revoked_sessions = revoked,
        "Account removed"
    );

    Ok(StatusCode::NO_CONTENT)
}
