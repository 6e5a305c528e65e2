//! # Community Management Handlers
//!
//! System-console CRUD for communities plus the enter endpoint every console
//! page calls to resolve which community it is operating on.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{CurrentPrincipal, PageArea, Role, enforce_area};
use crate::crypto::{decrypt_community_credentials, encrypt_community_credentials};
use crate::error::{ApiError, forbidden};
use crate::handlers::types::ApiResponse;
use crate::models::community::{CommunityStatus, Model as CommunityModel};
use crate::repositories::CommunityRepository;
use crate::repositories::community::CreateCommunityRequest;
use crate::server::AppState;
use crate::tenancy::{self, CommunitySummary, TenantResolution};

/// Request payload for creating a community
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommunityDto {
    /// URL-safe slug, used as the tenant key
    #[schema(example = "sunrise-court")]
    pub slug: String,
    #[schema(example = "日昇苑")]
    pub name: Option<String>,
    /// Backing-store credential bundle; encrypted at rest
    pub credentials: Option<serde_json::Value>,
}

/// Request payload for updating a community
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCommunityDto {
    pub name: Option<String>,
    pub credentials: Option<serde_json::Value>,
    pub status: Option<CommunityStatus>,
}

/// Public view of a community
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommunityDto {
    #[schema(example = "sunrise-court")]
    pub slug: String,
    pub name: Option<String>,
    #[schema(example = "active")]
    pub status: String,
    /// Whether a credential bundle is stored (the bundle itself is never listed)
    pub has_credentials: bool,
    pub created_at: String,
}

impl From<&CommunityModel> for CommunityDto {
    fn from(model: &CommunityModel) -> Self {
        Self {
            slug: model.slug.clone(),
            name: model.name.clone(),
            status: model.status.clone(),
            has_credentials: model.credentials_ciphertext.is_some(),
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Result of entering a community
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EnterCommunityDto {
    pub community: CommunitySummary,
    /// True when the requested community was unknown and the deployment
    /// default was substituted
    pub fell_back: bool,
}

/// Query parameters accepted by the enter endpoint
#[derive(Debug, Deserialize, ToSchema)]
pub struct EnterQuery {
    /// Explicit community slug; honored per the caller's role
    pub community: Option<String>,
}

fn encrypt_credentials(
    state: &AppState,
    slug: &str,
    credentials: &serde_json::Value,
) -> Result<Vec<u8>, ApiError> {
    let key = state.crypto_key.as_ref().ok_or_else(|| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "CRYPTO_NOT_CONFIGURED",
            "Credential encryption is not configured",
        )
    })?;

    encrypt_community_credentials(key, slug, credentials).map_err(|e| {
        tracing::error!(slug, "Credential encryption failed: {}", e);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Failed to store community credentials",
        )
    })
}

/// List all communities
#[utoipa::path(
    get,
    path = "/api/v1/communities",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All communities", body = ApiResponse<Vec<CommunityDto>>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "communities"
)]
pub async fn list_communities(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> Result<Json<ApiResponse<Vec<CommunityDto>>>, ApiError> {
    enforce_area(&state, &principal, PageArea::System).await?;

    let communities = CommunityRepository::new(&state.db).list().await?;
    let dtos: Vec<CommunityDto> = communities.iter().map(CommunityDto::from).collect();

    Ok(Json(ApiResponse::new(dtos)))
}

/// Create a community
#[utoipa::path(
    post,
    path = "/api/v1/communities",
    security(("bearer_auth" = [])),
    request_body = CreateCommunityDto,
    responses(
        (status = 201, description = "Community created", body = ApiResponse<CommunityDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 409, description = "Slug already exists", body = ApiError)
    ),
    tag = "communities"
)]
pub async fn create_community(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Json(request): Json<CreateCommunityDto>,
) -> Result<(StatusCode, Json<ApiResponse<CommunityDto>>), ApiError> {
    enforce_area(&state, &principal, PageArea::System).await?;

    let credentials_ciphertext = request
        .credentials
        .as_ref()
        .map(|credentials| encrypt_credentials(&state, &request.slug, credentials))
        .transpose()?;

    let community = CommunityRepository::new(&state.db)
        .create(CreateCommunityRequest {
            slug: request.slug,
            name: request.name,
            credentials_ciphertext,
        })
        .await?;

    tracing::info!(slug = community.slug, "Community created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CommunityDto::from(&community))),
    ))
}

/// Update a community
#[utoipa::path(
    patch,
    path = "/api/v1/communities/{slug}",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    request_body = UpdateCommunityDto,
    responses(
        (status = 200, description = "Updated community", body = ApiResponse<CommunityDto>),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Community not found", body = ApiError)
    ),
    tag = "communities"
)]
pub async fn update_community(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
    Json(request): Json<UpdateCommunityDto>,
) -> Result<Json<ApiResponse<CommunityDto>>, ApiError> {
    enforce_area(&state, &principal, PageArea::System).await?;

    let repo = CommunityRepository::new(&state.db);

    let mut community = repo.get_by_slug(&slug).await?.ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Community not found")
    })?;

    if let Some(name) = request.name {
        let name = if name.trim().is_empty() {
            None
        } else {
            Some(name.trim().to_string())
        };
        community = repo.update_name(&slug, name).await?;
    }

    if let Some(credentials) = request.credentials.as_ref() {
        let ciphertext = encrypt_credentials(&state, &slug, credentials)?;
        community = repo.update_credentials(&slug, Some(ciphertext)).await?;
    }

    if let Some(status) = request.status {
        community = repo.set_status(&slug, status).await?;
        if status == CommunityStatus::Disabled {
            // Anyone currently inside the community must re-resolve.
            state.tenants.invalidate_community(&slug).await;
        }
        tracing::info!(slug, status = status.as_str(), "Community status changed");
    }

    Ok(Json(ApiResponse::new(CommunityDto::from(&community))))
}

/// Delete a community and everything hanging off it
#[utoipa::path(
    delete,
    path = "/api/v1/communities/{slug}",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    responses(
        (status = 204, description = "Community deleted"),
        (status = 400, description = "The default community cannot be deleted", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Community not found", body = ApiError)
    ),
    tag = "communities"
)]
pub async fn delete_community(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    enforce_area(&state, &principal, PageArea::System).await?;

    if slug == state.config.default_community_slug {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "The default community cannot be deleted",
        ));
    }

    CommunityRepository::new(&state.db).delete(&slug).await?;
    state.tenants.invalidate_community(&slug).await;

    tracing::info!(slug, "Community deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Read a community's decrypted credential bundle
#[utoipa::path(
    get,
    path = "/api/v1/communities/{slug}/credentials",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    responses(
        (status = 200, description = "Decrypted credential bundle", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Community or bundle not found", body = ApiError)
    ),
    tag = "communities"
)]
pub async fn get_community_credentials(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    enforce_area(&state, &principal, PageArea::System).await?;

    let community = CommunityRepository::new(&state.db)
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| {
            ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Community not found")
        })?;

    let ciphertext = community.credentials_ciphertext.as_deref().ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "No credential bundle stored for this community",
        )
    })?;

    let key = state.crypto_key.as_ref().ok_or_else(|| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "CRYPTO_NOT_CONFIGURED",
            "Credential encryption is not configured",
        )
    })?;

    let credentials = decrypt_community_credentials(key, &slug, ciphertext).map_err(|e| {
        tracing::error!(slug, "Credential decryption failed: {}", e);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Failed to read community credentials",
        )
    })?;

    Ok(Json(ApiResponse::new(credentials)))
}

/// Enter a community
///
/// Resolves which community the caller operates on. Non-admin callers asking
/// for a foreign community are redirected to their canonical one; a disabled
/// community refuses entry.
#[utoipa::path(
    get,
    path = "/api/v1/enter",
    security(("bearer_auth" = [])),
    params(
        ("community" = Option<String>, Query, description = "Explicit community slug")
    ),
    responses(
        (status = 200, description = "Entered", body = ApiResponse<EnterCommunityDto>),
        (status = 307, description = "Redirect to the canonical community"),
        (status = 403, description = "Community disabled", body = ApiError)
    ),
    tag = "communities"
)]
pub async fn enter_community(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Query(query): Query<EnterQuery>,
) -> Result<Response, ApiError> {
    enter_with_slugs(state, principal, None, query.community).await
}

/// Enter a community addressed by path. Role rules are identical to the
/// query form; for system administrators the path takes precedence.
#[utoipa::path(
    get,
    path = "/api/v1/enter/{slug}",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    responses(
        (status = 200, description = "Entered", body = ApiResponse<EnterCommunityDto>),
        (status = 307, description = "Redirect to the canonical community"),
        (status = 403, description = "Community disabled", body = ApiError)
    ),
    tag = "communities"
)]
pub async fn enter_community_by_path(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
    Query(query): Query<EnterQuery>,
) -> Result<Response, ApiError> {
    enter_with_slugs(state, principal, Some(slug), query.community).await
}

async fn enter_with_slugs(
    state: AppState,
    principal: CurrentPrincipal,
    path_slug: Option<String>,
    query_slug: Option<String>,
) -> Result<Response, ApiError> {
    let resolution = tenancy::resolve_tenant(
        &state.db,
        &state.config,
        &principal,
        path_slug.as_deref(),
        query_slug.as_deref(),
    )
    .await?;

    match resolution {
        TenantResolution::Entered {
            community,
            fell_back,
        } => {
            let summary = CommunitySummary::from(&community);
            state
                .tenants
                .insert(principal.token_digest.clone(), summary.clone())
                .await;

            Ok(Json(ApiResponse::new(EnterCommunityDto {
                community: summary,
                fell_back,
            }))
            .into_response())
        }
        TenantResolution::Redirect { canonical } => {
            Ok(Redirect::temporary(&format!("/api/v1/enter/{canonical}")).into_response())
        }
        TenantResolution::Refused { slug } => {
            tracing::info!(slug, principal_id = %principal.id, "Entry refused");
            Err(community_disabled())
        }
    }
}

fn community_disabled() -> ApiError {
    ApiError::new(
        StatusCode::FORBIDDEN,
        "COMMUNITY_DISABLED",
        "This community has been disabled",
    )
}

/// Guard used by community-scoped admin endpoints: the caller must either be
/// a system administrator or belong to the addressed community.
pub fn require_community_scope(
    principal: &CurrentPrincipal,
    slug: &str,
    default_slug: &str,
) -> Result<(), ApiError> {
    if principal.role == Role::SystemAdmin {
        return Ok(());
    }

    let own = principal.community_slug.as_deref().unwrap_or(default_slug);
    if own == slug {
        return Ok(());
    }

    Err(forbidden(Some(
        "This account cannot manage another community",
    )))
}
