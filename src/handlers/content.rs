//! # Content Configuration Handlers
//!
//! Admin endpoints for editing a community's carousel and button documents,
//! the media upload endpoint backing them, and the aggregated front-page
//! configuration the resident pages render from.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentPrincipal, PageArea, enforce_area};
use crate::content::{self, ContentSource};
use crate::error::ApiError;
use crate::handlers::communities::require_community_scope;
use crate::handlers::types::ApiResponse;
use crate::models::button_config::ButtonDocument;
use crate::models::carousel_config::CarouselDocument;
use crate::server::AppState;
use crate::storage::{self, StoredMedia};
use crate::tenancy::{self, CommunitySummary, TenantResolution};

/// A carousel document together with where it came from
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CarouselConfigDto {
    #[serde(flatten)]
    pub document: CarouselDocument,
    pub source: ContentSource,
}

/// A button document together with where it came from
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ButtonConfigDto {
    #[serde(flatten)]
    pub document: ButtonDocument,
    pub source: ContentSource,
}

/// Everything a resident front page needs to render
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FrontConfigDto {
    pub community: CommunitySummary,
    /// True when the requested community was unknown and the deployment
    /// default was substituted
    pub fell_back: bool,
    pub carousel: CarouselConfigDto,
    pub buttons: ButtonConfigDto,
}

/// Result of a media upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MediaUploadDto {
    /// URL to reference the media by; a `data:` URL when storage degraded
    pub url: String,
    /// True when the backing store failed and the bytes were inlined
    pub inlined: bool,
}

/// Query parameters accepted by the front config endpoint
#[derive(Debug, Deserialize, ToSchema)]
pub struct FrontConfigQuery {
    /// Explicit community slug; honored per the caller's role
    pub community: Option<String>,
}

impl From<StoredMedia> for MediaUploadDto {
    fn from(stored: StoredMedia) -> Self {
        Self {
            url: stored.url,
            inlined: stored.inlined,
        }
    }
}

/// Read a community's carousel document
#[utoipa::path(
    get,
    path = "/api/v1/communities/{slug}/carousel",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    responses(
        (status = 200, description = "Carousel document", body = ApiResponse<CarouselConfigDto>),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "content"
)]
pub async fn get_carousel(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CarouselConfigDto>>, ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;
    require_community_scope(&principal, &slug, &state.config.default_community_slug)?;

    let (document, source) =
        content::load_carousel(&state.db, &slug, &state.config.default_community_slug).await?;

    Ok(Json(ApiResponse::new(CarouselConfigDto { document, source })))
}

/// Replace a community's carousel document
#[utoipa::path(
    put,
    path = "/api/v1/communities/{slug}/carousel",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    request_body = CarouselDocument,
    responses(
        (status = 200, description = "Stored document after sanitization", body = ApiResponse<CarouselDocument>),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Community not found", body = ApiError)
    ),
    tag = "content"
)]
pub async fn put_carousel(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
    Json(document): Json<CarouselDocument>,
) -> Result<Json<ApiResponse<CarouselDocument>>, ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;
    require_community_scope(&principal, &slug, &state.config.default_community_slug)?;

    let stored = content::save_carousel(&state.db, &slug, document, &state.config.carousel).await?;

    tracing::info!(
        community_slug = slug,
        slides = stored.items.len(),
        updated_by = %principal.id,
        "Carousel document replaced"
    );

    Ok(Json(ApiResponse::new(stored)))
}

/// Read a community's button document
#[utoipa::path(
    get,
    path = "/api/v1/communities/{slug}/buttons",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    responses(
        (status = 200, description = "Button document", body = ApiResponse<ButtonConfigDto>),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "content"
)]
pub async fn get_buttons(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ButtonConfigDto>>, ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;
    require_community_scope(&principal, &slug, &state.config.default_community_slug)?;

    let (document, source) =
        content::load_buttons(&state.db, &slug, &state.config.default_community_slug).await?;

    Ok(Json(ApiResponse::new(ButtonConfigDto { document, source })))
}

/// Replace a community's button document
#[utoipa::path(
    put,
    path = "/api/v1/communities/{slug}/buttons",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    request_body = ButtonDocument,
    responses(
        (status = 200, description = "Stored document after sanitization", body = ApiResponse<ButtonDocument>),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Community not found", body = ApiError)
    ),
    tag = "content"
)]
pub async fn put_buttons(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
    Json(document): Json<ButtonDocument>,
) -> Result<Json<ApiResponse<ButtonDocument>>, ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;
    require_community_scope(&principal, &slug, &state.config.default_community_slug)?;

    let stored = content::save_buttons(&state.db, &slug, document).await?;

    tracing::info!(
        community_slug = slug,
        updated_by = %principal.id,
        "Button document replaced"
    );

    Ok(Json(ApiResponse::new(stored)))
}

/// Read the aggregated front-page configuration
///
/// Resolves the caller's community, then returns the carousel and button
/// documents the resident pages render from. A non-admin asking for a
/// foreign community is redirected to its canonical one.
#[utoipa::path(
    get,
    path = "/api/v1/front/config",
    security(("bearer_auth" = [])),
    params(
        ("community" = Option<String>, Query, description = "Explicit community slug")
    ),
    responses(
        (status = 200, description = "Front-page configuration", body = ApiResponse<FrontConfigDto>),
        (status = 307, description = "Redirect to the canonical community"),
        (status = 403, description = "Community disabled", body = ApiError)
    ),
    tag = "content"
)]
pub async fn get_front_config(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Query(query): Query<FrontConfigQuery>,
) -> Result<Response, ApiError> {
    enforce_area(&state, &principal, PageArea::Front).await?;

    let resolution = tenancy::resolve_tenant(
        &state.db,
        &state.config,
        &principal,
        None,
        query.community.as_deref(),
    )
    .await?;

    let (community, fell_back) = match resolution {
        TenantResolution::Entered {
            community,
            fell_back,
        } => (community, fell_back),
        TenantResolution::Redirect { canonical } => {
            return Ok(
                Redirect::temporary(&format!("/api/v1/front/config?community={canonical}"))
                    .into_response(),
            );
        }
        TenantResolution::Refused { slug } => {
            tracing::info!(slug, principal_id = %principal.id, "Front config refused");
            return Err(ApiError::new(
                StatusCode::FORBIDDEN,
                "COMMUNITY_DISABLED",
                "This community has been disabled",
            ));
        }
    };

    let default_slug = &state.config.default_community_slug;
    let (carousel, carousel_source) =
        content::load_carousel(&state.db, &community.slug, default_slug).await?;
    let (buttons, buttons_source) =
        content::load_buttons(&state.db, &community.slug, default_slug).await?;

    Ok(Json(ApiResponse::new(FrontConfigDto {
        community: CommunitySummary::from(&community),
        fell_back,
        carousel: CarouselConfigDto {
            document: carousel,
            source: carousel_source,
        },
        buttons: ButtonConfigDto {
            document: buttons,
            source: buttons_source,
        },
    }))
    .into_response())
}

/// Upload a media file for a community
///
/// The raw body is the file; `Content-Type` names the format. When the
/// backing store is unavailable the upload still succeeds and the returned
/// URL inlines the bytes.
#[utoipa::path(
    post,
    path = "/api/v1/communities/{slug}/media",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Community slug")),
    responses(
        (status = 201, description = "Media stored", body = ApiResponse<MediaUploadDto>),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 413, description = "File too large", body = ApiError),
        (status = 415, description = "Unsupported media type", body = ApiError)
    ),
    tag = "content"
)]
pub async fn upload_media(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(slug): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<MediaUploadDto>>), ApiError> {
    enforce_area(&state, &principal, PageArea::Admin).await?;
    require_community_scope(&principal, &slug, &state.config.default_community_slug)?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let extension = extension_for(content_type).ok_or_else(|| {
        ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "UNSUPPORTED_MEDIA_TYPE",
            "Only image uploads are accepted",
        )
    })?;

    let max_bytes = state.config.media.max_upload_kb * 1024;
    if body.len() > max_bytes {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            "Uploaded file exceeds the size limit",
        )
        .with_details(serde_json::json!({
            "max_bytes": max_bytes,
            "actual_bytes": body.len()
        })));
    }

    let path = format!("{slug}/{}.{extension}", Uuid::new_v4());
    let stored =
        storage::store_with_fallback(state.blobs.as_ref(), &path, content_type, &body).await;

    tracing::info!(
        community_slug = slug,
        path,
        bytes = body.len(),
        inlined = stored.inlined,
        "Media uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(MediaUploadDto::from(stored))),
    ))
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
