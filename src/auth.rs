//! # Authentication and Authorization
//!
//! Session bearer authentication and the role gate for protected API
//! endpoints. Every authenticated request resolves to a [`CurrentPrincipal`]
//! carrying the effective role; page areas are checked against the
//! role/area capability table before any tenant data is touched.

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng as PasswordOsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, account_disabled, forbidden, unauthorized};
use crate::models::principal::Model as PrincipalModel;
use crate::repositories::{PrincipalRepository, SessionRepository};
use crate::server::AppState;

/// Role of an authenticated principal, ordered from widest to narrowest reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operates every community and the system console
    SystemAdmin,
    /// Operates the admin console of their own community
    CommunityAdmin,
    /// Uses the resident-facing pages of their community
    Resident,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SystemAdmin => "system_admin",
            Role::CommunityAdmin => "community_admin",
            Role::Resident => "resident",
        }
    }

    /// Parse a stored role string. Unknown values resolve to the narrowest
    /// role rather than failing open.
    pub fn parse(value: &str) -> Self {
        match value {
            "system_admin" => Role::SystemAdmin,
            "community_admin" => Role::CommunityAdmin,
            _ => Role::Resident,
        }
    }

    /// Whether this role may enter the given page area.
    pub fn allows(&self, area: PageArea) -> bool {
        match self {
            Role::SystemAdmin => true,
            Role::CommunityAdmin => matches!(area, PageArea::Admin | PageArea::Front),
            Role::Resident => matches!(area, PageArea::Front),
        }
    }
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Disabled,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Disabled => "disabled",
        }
    }

    /// Unknown stored values are treated as disabled.
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => AccountStatus::Active,
            _ => AccountStatus::Disabled,
        }
    }
}

/// The three protected areas of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PageArea {
    /// Cross-community system console
    System,
    /// Per-community admin console
    Admin,
    /// Resident-facing pages
    Front,
}

/// The authenticated principal attached to each request after the session
/// middleware has run. `role` is the effective role, with the superadmin
/// email override already applied.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub community_slug: Option<String>,
    /// Digest of the bearer token this request authenticated with
    pub token_digest: String,
}

impl CurrentPrincipal {
    /// Build the request principal from a stored record, applying the
    /// superadmin email override from configuration.
    pub fn from_model(model: &PrincipalModel, config: &AppConfig, token_digest: String) -> Self {
        let stored_role = Role::parse(&model.role);
        let role = if config
            .superadmin_email
            .as_deref()
            .is_some_and(|email| email.eq_ignore_ascii_case(&model.email))
        {
            Role::SystemAdmin
        } else {
            stored_role
        };

        Self {
            id: model.id,
            email: model.email.clone(),
            display_name: model.display_name.clone(),
            phone: model.phone.clone(),
            photo_url: model.photo_url.clone(),
            role,
            status: AccountStatus::parse(&model.status),
            community_slug: model.community_slug.clone(),
            token_digest,
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Errors from password hashing and verification.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

impl From<PasswordError> for ApiError {
    fn from(error: PasswordError) -> Self {
        tracing::error!("Password handling error: {}", error);
        ApiError::new(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

/// Hash a password with Argon2id, producing a PHC-format string.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut PasswordOsRng);

    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a password against a stored PHC-format hash.
pub fn verify_password(plain: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// A freshly issued bearer token and the digest stored for it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

/// Issue a new opaque bearer token. Only its SHA-256 digest is persisted.
pub fn issue_token(ttl_hours: u64) -> IssuedToken {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);

    let token = base64_url::encode(&bytes);
    let digest = digest_token(&token);
    let expires_at = Utc::now() + Duration::hours(ttl_hours as i64);

    IssuedToken {
        token,
        digest,
        expires_at,
    }
}

/// Compute the stored digest of a bearer token.
pub fn digest_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Authentication middleware: resolves the bearer token to a principal and
/// attaches it to the request. Disabled accounts have their sessions revoked
/// on the spot.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?.to_string();
    let digest = digest_token(&token);

    let sessions = SessionRepository::new(&state.db);
    let session = sessions
        .find_by_digest(&digest)
        .await?
        .ok_or_else(|| unauthorized(Some("Invalid or revoked session")))?;

    // The lookup already matched by digest; compare again in constant time so
    // a backend with a lossy collation cannot weaken the check.
    if !bool::from(ConstantTimeEq::ct_eq(
        session.token_digest.as_bytes(),
        digest.as_bytes(),
    )) {
        return Err(unauthorized(Some("Invalid or revoked session")));
    }

    let now = Utc::now();
    if session.expires_at < now {
        sessions.revoke(&digest).await?;
        return Err(unauthorized(Some("Session expired")));
    }

    let principals = PrincipalRepository::new(&state.db);
    let model = principals
        .find_by_id(session.principal_id)
        .await?
        .ok_or_else(|| unauthorized(Some("Account no longer exists")))?;

    let principal = CurrentPrincipal::from_model(&model, &state.config, digest);

    if principal.status == AccountStatus::Disabled {
        // A disabled account keeps no live sessions.
        sessions.revoke_for_principal(principal.id).await?;
        return Err(account_disabled());
    }

    tracing::debug!(
        principal_id = %principal.id,
        role = principal.role.as_str(),
        "Authenticated request"
    );

    let mut request = request;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))
        .and_then(|value| {
            value
                .to_str()
                .map_err(|_| unauthorized(Some("Invalid Authorization header")))
        })
        .and_then(|header| {
            header
                .strip_prefix("Bearer ")
                .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
        })
}

/// Check the capability table for a page area. On refusal the offending
/// session is revoked, forcing a fresh sign-in.
pub async fn enforce_area(
    state: &AppState,
    principal: &CurrentPrincipal,
    area: PageArea,
) -> Result<(), ApiError> {
    if principal.role.allows(area) {
        return Ok(());
    }

    tracing::warn!(
        principal_id = %principal.id,
        role = principal.role.as_str(),
        ?area,
        "Role gate refused area access; revoking session"
    );

    SessionRepository::new(&state.db)
        .revoke(&principal.token_digest)
        .await?;

    Err(forbidden(Some(
        "This account is not allowed to access this area",
    )))
}

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    Arc<AppConfig>: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentPrincipal>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table() {
        assert!(Role::SystemAdmin.allows(PageArea::System));
        assert!(Role::SystemAdmin.allows(PageArea::Admin));
        assert!(Role::SystemAdmin.allows(PageArea::Front));

        assert!(!Role::CommunityAdmin.allows(PageArea::System));
        assert!(Role::CommunityAdmin.allows(PageArea::Admin));
        assert!(Role::CommunityAdmin.allows(PageArea::Front));

        assert!(!Role::Resident.allows(PageArea::System));
        assert!(!Role::Resident.allows(PageArea::Admin));
        assert!(Role::Resident.allows(PageArea::Front));
    }

    #[test]
    fn unknown_role_resolves_to_resident() {
        assert_eq!(Role::parse("system_admin"), Role::SystemAdmin);
        assert_eq!(Role::parse("community_admin"), Role::CommunityAdmin);
        assert_eq!(Role::parse("resident"), Role::Resident);
        assert_eq!(Role::parse("superuser"), Role::Resident);
    }

    #[test]
    fn unknown_status_resolves_to_disabled() {
        assert_eq!(AccountStatus::parse("active"), AccountStatus::Active);
        assert_eq!(AccountStatus::parse("disabled"), AccountStatus::Disabled);
        assert_eq!(AccountStatus::parse("archived"), AccountStatus::Disabled);
    }

    #[test]
    fn issued_tokens_are_unique_and_digestible() {
        let a = issue_token(72);
        let b = issue_token(72);

        assert_ne!(a.token, b.token);
        assert_eq!(a.digest, digest_token(&a.token));
        assert_eq!(a.digest.len(), 64); // hex-encoded SHA-256
        assert!(a.expires_at > Utc::now());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(hash.starts_with("$argon2id$"));

        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let result = verify_password("whatever", "not-a-phc-hash");
        assert!(matches!(result, Err(PasswordError::MalformedHash(_))));
    }

    #[test]
    fn superadmin_email_override_forces_system_admin() {
        use chrono::Utc;

        let model = PrincipalModel {
            id: Uuid::new_v4(),
            email: "root@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            display_name: None,
            phone: None,
            photo_url: None,
            role: "resident".to_string(),
            status: "active".to_string(),
            community_slug: None,
            household: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        };

        let config = AppConfig {
            superadmin_email: Some("ROOT@example.com".to_string()),
            ..AppConfig::default()
        };

        let principal = CurrentPrincipal::from_model(&model, &config, "digest".to_string());
        assert_eq!(principal.role, Role::SystemAdmin);

        let plain_config = AppConfig::default();
        let plain = CurrentPrincipal::from_model(&model, &plain_config, "digest".to_string());
        assert_eq!(plain.role, Role::Resident);
    }
}
