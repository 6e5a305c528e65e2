//! # Principal Repository
//!
//! Repository implementation for Principal entities. Lookups by email are
//! case-insensitive: emails are normalized to lowercase on write.

use crate::auth::{AccountStatus, Role};
use crate::error::RepositoryError;
use crate::models::principal::{
    ActiveModel as PrincipalActiveModel, Column as PrincipalColumn, Entity as Principal,
    Model as PrincipalModel,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

/// Request data for creating a new principal
#[derive(Debug, Clone)]
pub struct CreatePrincipalRequest {
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub role: Role,
    pub community_slug: Option<String>,
    pub household: Option<serde_json::Value>,
}

/// Profile fields a principal may edit about themselves
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub photo_url: Option<Option<String>>,
}

/// Repository for Principal database operations
pub struct PrincipalRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> PrincipalRepository<'a> {
    /// Create a new PrincipalRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new principal
    pub async fn create(
        &self,
        request: CreatePrincipalRequest,
    ) -> Result<PrincipalModel, RepositoryError> {
        let email = Self::normalize_email(&request.email)?;

        let now = Utc::now();

        let principal = PrincipalActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(request.password_hash),
            display_name: Set(request.display_name),
            phone: Set(request.phone),
            photo_url: Set(request.photo_url),
            role: Set(request.role.as_str().to_string()),
            status: Set(AccountStatus::Active.as_str().to_string()),
            community_slug: Set(request.community_slug),
            household: Set(request.household),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let result = principal
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Find a principal by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PrincipalModel>, RepositoryError> {
        let principal = Principal::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(principal)
    }

    /// Find a principal by email (case-insensitive)
    pub async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PrincipalModel>, RepositoryError> {
        let normalized = email.trim().to_lowercase();

        let principal = Principal::find()
            .filter(PrincipalColumn::Email.eq(normalized))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(principal)
    }

    /// List principals of a community filtered by role, newest first
    pub async fn list_by_community(
        &self,
        community_slug: &str,
        role: Role,
    ) -> Result<Vec<PrincipalModel>, RepositoryError> {
        let principals = Principal::find()
            .filter(PrincipalColumn::CommunitySlug.eq(community_slug))
            .filter(PrincipalColumn::Role.eq(role.as_str()))
            .order_by_desc(PrincipalColumn::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(principals)
    }

    /// List all administrator accounts across communities
    pub async fn list_admins(&self) -> Result<Vec<PrincipalModel>, RepositoryError> {
        let principals = Principal::find()
            .filter(PrincipalColumn::Role.is_in(vec![
                Role::SystemAdmin.as_str(),
                Role::CommunityAdmin.as_str(),
            ]))
            .order_by_desc(PrincipalColumn::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(principals)
    }

    /// Update editable profile fields
    pub async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<PrincipalModel, RepositoryError> {
        let principal = self.require(id).await?;

        let mut active = principal.into_active_model();
        if let Some(display_name) = update.display_name {
            active.display_name = Set(display_name);
        }
        if let Some(phone) = update.phone {
            active.phone = Set(phone);
        }
        if let Some(photo_url) = update.photo_url {
            active.photo_url = Set(photo_url);
        }
        active.updated_at = Set(Utc::now().into());

        let result = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Replace the stored password hash
    pub async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: String,
    ) -> Result<PrincipalModel, RepositoryError> {
        let principal = self.require(id).await?;

        let mut active = principal.into_active_model();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(Utc::now().into());

        let result = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Change the role of a principal
    pub async fn set_role(&self, id: Uuid, role: Role) -> Result<PrincipalModel, RepositoryError> {
        let principal = self.require(id).await?;

        let mut active = principal.into_active_model();
        active.role = Set(role.as_str().to_string());
        active.updated_at = Set(Utc::now().into());

        let result = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Change the account status of a principal
    pub async fn set_status(
        &self,
        id: Uuid,
        status: AccountStatus,
    ) -> Result<PrincipalModel, RepositoryError> {
        let principal = self.require(id).await?;

        let mut active = principal.into_active_model();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now().into());

        let result = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Move a principal to a different community
    pub async fn set_community(
        &self,
        id: Uuid,
        community_slug: Option<String>,
    ) -> Result<PrincipalModel, RepositoryError> {
        let principal = self.require(id).await?;

        let mut active = principal.into_active_model();
        active.community_slug = Set(community_slug);
        active.updated_at = Set(Utc::now().into());

        let result = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Insert a resident or, when the email already exists, update the
    /// existing record in place. Used by bulk import so re-running an import
    /// is idempotent.
    pub async fn upsert_resident(
        &self,
        request: CreatePrincipalRequest,
    ) -> Result<PrincipalModel, RepositoryError> {
        let email = Self::normalize_email(&request.email)?;

        match self.find_by_email(&email).await? {
            Some(existing) => {
                let id = existing.id;
                let mut active = existing.into_active_model();
                active.display_name = Set(request.display_name);
                active.phone = Set(request.phone);
                if request.photo_url.is_some() {
                    active.photo_url = Set(request.photo_url);
                }
                active.community_slug = Set(request.community_slug);
                active.household = Set(request.household);
                active.updated_at = Set(Utc::now().into());

                let result = active
                    .update(self.db)
                    .await
                    .map_err(RepositoryError::database_error)?;

                debug_assert_eq!(result.id, id);
                Ok(result)
            }
            None => self.create(CreatePrincipalRequest { email, ..request }).await,
        }
    }

    /// Count principals of a community
    pub async fn count_by_community(&self, community_slug: &str) -> Result<u64, RepositoryError> {
        Principal::find()
            .filter(PrincipalColumn::CommunitySlug.eq(community_slug))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn require(&self, id: Uuid) -> Result<PrincipalModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Principal not found".to_string()))
    }

    fn normalize_email(email: &str) -> Result<String, RepositoryError> {
        let normalized = email.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(RepositoryError::validation_error("Email cannot be empty"));
        }

        let parts: Vec<&str> = normalized.split('@').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(RepositoryError::validation_error(
                "Email must contain a local part and a domain",
            ));
        }

        Ok(normalized)
    }
}
