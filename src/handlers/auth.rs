//! # Authentication Handlers
//!
//! Sign-up, sign-in, sign-out, password management and the current-principal
//! profile endpoints. Sign-in failures are deliberately uniform so the API
//! never confirms whether an email exists.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{
    self, AccountStatus, CurrentPrincipal, Role, hash_password, verify_password,
};
use crate::error::{ApiError, account_disabled, unauthorized, validation_error};
use crate::handlers::types::{ApiResponse, PrincipalDto};
use crate::repositories::principal::{CreatePrincipalRequest, ProfileUpdate};
use crate::repositories::{PrincipalRepository, SessionRepository};
use crate::server::AppState;

const MIN_PASSWORD_LEN: usize = 8;

/// Request payload for account registration
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignUpRequestDto {
    #[schema(example = "resident@example.com")]
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
}

/// Request payload for signing in
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInRequestDto {
    #[schema(example = "resident@example.com")]
    pub email: String,
    pub password: String,
}

/// A session token and the principal it belongs to
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionDto {
    /// Opaque bearer token; shown once at issue time
    pub token: String,
    /// Token expiry (ISO 8601)
    pub expires_at: String,
    pub principal: PrincipalDto,
}

/// Request payload for requesting a password reset
#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetRequestDto {
    pub email: String,
}

/// Request payload for changing the signed-in account's password
#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordChangeRequestDto {
    pub current_password: String,
    pub new_password: String,
}

/// Request payload for editing the signed-in account's profile.
/// Absent fields are left unchanged; an empty string clears the field.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileUpdateDto {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
}

fn clearable(field: Option<String>) -> Option<Option<String>> {
    field.map(|value| {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    })
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(validation_error(
            "Password is too short",
            serde_json::json!({
                "field": "password",
                "min_length": MIN_PASSWORD_LEN
            }),
        ));
    }
    Ok(())
}

/// Register a resident account
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-up",
    request_body = SignUpRequestDto,
    responses(
        (status = 201, description = "Account created and signed in", body = ApiResponse<SessionDto>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequestDto>,
) -> Result<(StatusCode, Json<ApiResponse<SessionDto>>), ApiError> {
    validate_password(&request.password)?;

    let password_hash = hash_password(&request.password)?;

    // New registrations always land in the default community as residents;
    // promotion happens through the principal management endpoints.
    let principal = PrincipalRepository::new(&state.db)
        .create(CreatePrincipalRequest {
            email: request.email,
            password_hash,
            display_name: request.display_name,
            phone: request.phone,
            photo_url: None,
            role: Role::Resident,
            community_slug: Some(state.config.default_community_slug.clone()),
            household: None,
        })
        .await?;

    tracing::info!(principal_id = %principal.id, "Account registered");

    let session = open_session(&state, &principal).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(session))))
}

/// Sign in with email and password
///
/// An unknown email provisions a fresh resident account on the spot and
/// signs it in; a known email must present the matching password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-in",
    request_body = SignInRequestDto,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<SessionDto>),
        (status = 401, description = "Wrong password", body = ApiError),
        (status = 403, description = "Account disabled", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequestDto>,
) -> Result<Json<ApiResponse<SessionDto>>, ApiError> {
    let principals = PrincipalRepository::new(&state.db);

    let principal = match principals.find_by_email(&request.email).await? {
        Some(principal) => principal,
        None => {
            // First sign-in provisions the account as a resident of the
            // default community.
            validate_password(&request.password)?;
            let password_hash = hash_password(&request.password)?;
            let created = principals
                .create(CreatePrincipalRequest {
                    email: request.email,
                    password_hash,
                    display_name: None,
                    phone: None,
                    photo_url: None,
                    role: Role::Resident,
                    community_slug: Some(state.config.default_community_slug.clone()),
                    household: None,
                })
                .await?;
            tracing::info!(principal_id = %created.id, "Account auto-provisioned at sign-in");
            created
        }
    };

    if !verify_password(&request.password, &principal.password_hash)? {
        tracing::info!(principal_id = %principal.id, "Sign-in rejected: wrong password");
        return Err(unauthorized(Some("Wrong password")));
    }

    if AccountStatus::parse(&principal.status) == AccountStatus::Disabled {
        // A disabled account keeps no live sessions.
        SessionRepository::new(&state.db)
            .revoke_for_principal(principal.id)
            .await?;
        return Err(account_disabled());
    }

    let session = open_session(&state, &principal).await?;
    tracing::info!(principal_id = %principal.id, "Signed in");

    Ok(Json(ApiResponse::new(session)))
}

/// Sign out the current session
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-out",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn sign_out(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> Result<StatusCode, ApiError> {
    SessionRepository::new(&state.db)
        .revoke(&principal.token_digest)
        .await?;
    state.tenants.invalidate_session(&principal.token_digest).await;

    tracing::info!(principal_id = %principal.id, "Signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// Request a password reset
#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset",
    request_body = PasswordResetRequestDto,
    responses(
        (status = 202, description = "Reset accepted; a link is sent if the account exists")
    ),
    tag = "auth"
)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetRequestDto>,
) -> Result<StatusCode, ApiError> {
    // Always accepted so the endpoint cannot be used to probe for accounts.
    match PrincipalRepository::new(&state.db)
        .find_by_email(&request.email)
        .await?
    {
        Some(principal) => {
            tracing::info!(principal_id = %principal.id, "Password reset requested");
        }
        None => {
            tracing::debug!("Password reset requested for unknown email");
        }
    }

    Ok(StatusCode::ACCEPTED)
}

/// Change the signed-in account's password
#[utoipa::path(
    post,
    path = "/api/v1/auth/password-change",
    security(("bearer_auth" = [])),
    request_body = PasswordChangeRequestDto,
    responses(
        (status = 204, description = "Password changed; other sessions revoked"),
        (status = 400, description = "New password too weak", body = ApiError),
        (status = 401, description = "Current password wrong", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Json(request): Json<PasswordChangeRequestDto>,
) -> Result<StatusCode, ApiError> {
    validate_password(&request.new_password)?;

    let principals = PrincipalRepository::new(&state.db);
    let model = principals
        .find_by_id(principal.id)
        .await?
        .ok_or_else(|| unauthorized(Some("Account no longer exists")))?;

    if !verify_password(&request.current_password, &model.password_hash)? {
        return Err(unauthorized(Some("Current password is wrong")));
    }

    let new_hash = hash_password(&request.new_password)?;
    principals.set_password_hash(principal.id, new_hash).await?;

    // Every session is revoked, this one included; the caller signs in again
    // with the new password.
    SessionRepository::new(&state.db)
        .revoke_for_principal(principal.id)
        .await?;
    state.tenants.invalidate_session(&principal.token_digest).await;

    tracing::info!(principal_id = %principal.id, "Password changed; all sessions revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// Get the signed-in account's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current principal", body = ApiResponse<PrincipalDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> Result<Json<ApiResponse<PrincipalDto>>, ApiError> {
    // Reload so household data and fresh profile edits are included.
    let model = PrincipalRepository::new(&state.db)
        .find_by_id(principal.id)
        .await?
        .ok_or_else(|| unauthorized(Some("Account no longer exists")))?;

    Ok(Json(ApiResponse::new(PrincipalDto::from(&model))))
}

/// Update the signed-in account's profile
#[utoipa::path(
    patch,
    path = "/api/v1/auth/me",
    security(("bearer_auth" = [])),
    request_body = ProfileUpdateDto,
    responses(
        (status = 200, description = "Updated principal", body = ApiResponse<PrincipalDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn update_me(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Json(request): Json<ProfileUpdateDto>,
) -> Result<Json<ApiResponse<PrincipalDto>>, ApiError> {
    let updated = PrincipalRepository::new(&state.db)
        .update_profile(
            principal.id,
            ProfileUpdate {
                display_name: clearable(request.display_name),
                phone: clearable(request.phone),
                photo_url: clearable(request.photo_url),
            },
        )
        .await?;

    Ok(Json(ApiResponse::new(PrincipalDto::from(&updated))))
}

async fn open_session(
    state: &AppState,
    principal: &crate::models::principal::Model,
) -> Result<SessionDto, ApiError> {
    let token = auth::issue_token(state.config.session.ttl_hours);

    SessionRepository::new(&state.db)
        .create(token.digest.clone(), principal.id, token.expires_at)
        .await?;

    Ok(SessionDto {
        token: token.token,
        expires_at: token.expires_at.to_rfc3339(),
        principal: PrincipalDto::from(principal),
    })
}
