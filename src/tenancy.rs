//! # Tenant Resolution
//!
//! Maps a request to the community it operates on. System administrators may
//! address any community explicitly (path first, then query); everyone else
//! is pinned to the community stored on their account, and an explicit slug
//! that differs produces a redirect to the canonical one rather than a
//! foreign-tenant fetch.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::auth::{CurrentPrincipal, Role};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::community::Model as CommunityModel;
use crate::repositories::CommunityRepository;
use sea_orm::DatabaseConnection;

/// Which community slug a request should use, decided purely from the
/// principal and the explicitly supplied slugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugDecision {
    /// Proceed with this slug.
    Use(String),
    /// The caller asked for a community it does not belong to; send it to
    /// its canonical slug instead.
    Redirect(String),
}

/// Decide the community slug for a request.
///
/// Precedence for system administrators: path slug, then query slug, then
/// the community stored on the account, then the deployment default. For
/// all other roles the stored community is authoritative.
pub fn decide_slug(
    role: Role,
    stored: Option<&str>,
    path_slug: Option<&str>,
    query_slug: Option<&str>,
    default_slug: &str,
) -> SlugDecision {
    // An empty slug counts as absent, so it cannot shadow the next source.
    let explicit = path_slug
        .filter(|s| !s.is_empty())
        .or(query_slug.filter(|s| !s.is_empty()));

    match role {
        Role::SystemAdmin => {
            let slug = explicit
                .or(stored)
                .filter(|s| !s.is_empty())
                .unwrap_or(default_slug);
            SlugDecision::Use(slug.to_string())
        }
        Role::CommunityAdmin | Role::Resident => {
            let canonical = stored.filter(|s| !s.is_empty()).unwrap_or(default_slug);
            match explicit {
                Some(requested) if requested != canonical => {
                    SlugDecision::Redirect(canonical.to_string())
                }
                _ => SlugDecision::Use(canonical.to_string()),
            }
        }
    }
}

/// Outcome of resolving a request to a community.
#[derive(Debug, Clone)]
pub enum TenantResolution {
    /// The request may proceed against this community. `fell_back` is set
    /// when the requested community did not exist and the deployment
    /// default was substituted.
    Entered {
        community: CommunityModel,
        fell_back: bool,
    },
    /// The caller must be redirected to its canonical community.
    Redirect { canonical: String },
    /// The community exists but has been disabled; entry is refused.
    Refused { slug: String },
}

/// Resolve the community a request operates on.
pub async fn resolve_tenant(
    db: &DatabaseConnection,
    config: &AppConfig,
    principal: &CurrentPrincipal,
    path_slug: Option<&str>,
    query_slug: Option<&str>,
) -> Result<TenantResolution, ApiError> {
    let decision = decide_slug(
        principal.role,
        principal.community_slug.as_deref(),
        path_slug,
        query_slug,
        &config.default_community_slug,
    );

    let slug = match decision {
        SlugDecision::Redirect(canonical) => {
            tracing::info!(
                principal_id = %principal.id,
                canonical,
                "Redirecting request to canonical community"
            );
            return Ok(TenantResolution::Redirect { canonical });
        }
        SlugDecision::Use(slug) => slug,
    };

    let repo = CommunityRepository::new(db);

    let (community, fell_back) = match repo.get_by_slug(&slug).await? {
        Some(community) => (community, false),
        None => {
            // Unknown community: substitute the deployment default so the
            // caller still gets a working (if generic) console.
            tracing::warn!(slug, "Community not found; falling back to default");
            let fallback = repo
                .get_by_slug(&config.default_community_slug)
                .await?
                .ok_or_else(|| {
                    ApiError::new(
                        axum::http::StatusCode::NOT_FOUND,
                        "NOT_FOUND",
                        "Community not found",
                    )
                })?;
            (fallback, true)
        }
    };

    if !community.is_active() {
        tracing::info!(slug = community.slug, "Refusing entry to disabled community");
        return Ok(TenantResolution::Refused {
            slug: community.slug,
        });
    }

    Ok(TenantResolution::Entered {
        community,
        fell_back,
    })
}

/// Summary of a resolved community, cached per session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommunitySummary {
    pub slug: String,
    pub name: Option<String>,
    pub status: String,
}

impl From<&CommunityModel> for CommunitySummary {
    fn from(model: &CommunityModel) -> Self {
        Self {
            slug: model.slug.clone(),
            name: model.name.clone(),
            status: model.status.clone(),
        }
    }
}

/// Session-scoped cache of resolved communities, keyed by token digest.
/// Saves a lookup per request and is invalidated whenever community
/// records change.
#[derive(Debug, Clone, Default)]
pub struct TenantCache {
    entries: Arc<RwLock<HashMap<String, CommunitySummary>>>,
}

impl TenantCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, token_digest: &str) -> Option<CommunitySummary> {
        self.entries.read().await.get(token_digest).cloned()
    }

    pub async fn insert(&self, token_digest: String, summary: CommunitySummary) {
        self.entries.write().await.insert(token_digest, summary);
    }

    /// Drop the cached community for one session.
    pub async fn invalidate_session(&self, token_digest: &str) {
        self.entries.write().await.remove(token_digest);
    }

    /// Drop every cached entry for a community, e.g. after it is disabled
    /// or deleted.
    pub async fn invalidate_community(&self, slug: &str) {
        self.entries
            .write()
            .await
            .retain(|_, summary| summary.slug != slug);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_admin_prefers_path_then_query_then_stored() {
        let decision = decide_slug(
            Role::SystemAdmin,
            Some("stored"),
            Some("from-path"),
            Some("from-query"),
            "default",
        );
        assert_eq!(decision, SlugDecision::Use("from-path".to_string()));

        let decision = decide_slug(
            Role::SystemAdmin,
            Some("stored"),
            None,
            Some("from-query"),
            "default",
        );
        assert_eq!(decision, SlugDecision::Use("from-query".to_string()));

        let decision = decide_slug(Role::SystemAdmin, Some("stored"), None, None, "default");
        assert_eq!(decision, SlugDecision::Use("stored".to_string()));

        // An empty path slug does not shadow the query slug.
        let decision = decide_slug(
            Role::SystemAdmin,
            Some("stored"),
            Some(""),
            Some("from-query"),
            "default",
        );
        assert_eq!(decision, SlugDecision::Use("from-query".to_string()));

        let decision = decide_slug(Role::SystemAdmin, None, None, None, "default");
        assert_eq!(decision, SlugDecision::Use("default".to_string()));
    }

    #[test]
    fn non_admin_stored_community_is_authoritative() {
        let decision = decide_slug(Role::Resident, Some("home"), None, None, "default");
        assert_eq!(decision, SlugDecision::Use("home".to_string()));

        // Matching explicit slug passes through.
        let decision = decide_slug(Role::Resident, Some("home"), Some("home"), None, "default");
        assert_eq!(decision, SlugDecision::Use("home".to_string()));
    }

    #[test]
    fn non_admin_foreign_slug_redirects() {
        let decision = decide_slug(Role::Resident, Some("home"), Some("other"), None, "default");
        assert_eq!(decision, SlugDecision::Redirect("home".to_string()));

        let decision = decide_slug(
            Role::CommunityAdmin,
            Some("home"),
            None,
            Some("other"),
            "default",
        );
        assert_eq!(decision, SlugDecision::Redirect("home".to_string()));
    }

    #[test]
    fn non_admin_without_stored_community_uses_default() {
        let decision = decide_slug(Role::Resident, None, None, None, "default");
        assert_eq!(decision, SlugDecision::Use("default".to_string()));

        // An explicit slug differing from the default still redirects.
        let decision = decide_slug(Role::Resident, None, Some("other"), None, "default");
        assert_eq!(decision, SlugDecision::Redirect("default".to_string()));
    }

    #[test]
    fn empty_slugs_are_ignored() {
        let decision = decide_slug(Role::SystemAdmin, Some(""), Some(""), None, "default");
        assert_eq!(decision, SlugDecision::Use("default".to_string()));
    }

    #[tokio::test]
    async fn cache_invalidation_by_community() {
        let cache = TenantCache::new();
        cache
            .insert(
                "digest-1".to_string(),
                CommunitySummary {
                    slug: "sunrise-court".to_string(),
                    name: None,
                    status: "active".to_string(),
                },
            )
            .await;
        cache
            .insert(
                "digest-2".to_string(),
                CommunitySummary {
                    slug: "harbor-view".to_string(),
                    name: None,
                    status: "active".to_string(),
                },
            )
            .await;

        cache.invalidate_community("sunrise-court").await;

        assert!(cache.get("digest-1").await.is_none());
        assert!(cache.get("digest-2").await.is_some());
    }
}
