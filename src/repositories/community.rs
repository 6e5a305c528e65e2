//! # Community Repository
//!
//! Repository implementation for Community entities. Communities are the
//! tenant unit; their slug is the foreign key everything else hangs off.

use crate::error::RepositoryError;
use crate::models::community::{
    ActiveModel as CommunityActiveModel, CommunityStatus, Entity as Community,
    Model as CommunityModel,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryOrder, Set,
};

use crate::models::community::Column as CommunityColumn;

/// Request data for creating a new community
#[derive(Debug, Clone)]
pub struct CreateCommunityRequest {
    /// URL-safe slug, used as the tenant key
    pub slug: String,
    /// Display name for the community
    pub name: Option<String>,
    /// Encrypted backing-store credential bundle
    pub credentials_ciphertext: Option<Vec<u8>>,
}

/// Repository for Community database operations
pub struct CommunityRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CommunityRepository<'a> {
    /// Create a new CommunityRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new community
    pub async fn create(
        &self,
        request: CreateCommunityRequest,
    ) -> Result<CommunityModel, RepositoryError> {
        self.validate_slug(&request.slug)?;

        let now = Utc::now();

        let community = CommunityActiveModel {
            slug: Set(request.slug),
            name: Set(request.name),
            status: Set(CommunityStatus::Active.as_str().to_string()),
            credentials_ciphertext: Set(request.credentials_ciphertext),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let result = community
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Get a community by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<CommunityModel>, RepositoryError> {
        let community = Community::find_by_id(slug.to_string())
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(community)
    }

    /// List all communities ordered by slug
    pub async fn list(&self) -> Result<Vec<CommunityModel>, RepositoryError> {
        let communities = Community::find()
            .order_by_asc(CommunityColumn::Slug)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(communities)
    }

    /// Update the display name of a community
    pub async fn update_name(
        &self,
        slug: &str,
        name: Option<String>,
    ) -> Result<CommunityModel, RepositoryError> {
        let community = self.require(slug).await?;

        let mut active = community.into_active_model();
        active.name = Set(name);
        active.updated_at = Set(Utc::now().into());

        let result = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Replace the encrypted credential bundle of a community
    pub async fn update_credentials(
        &self,
        slug: &str,
        credentials_ciphertext: Option<Vec<u8>>,
    ) -> Result<CommunityModel, RepositoryError> {
        let community = self.require(slug).await?;

        let mut active = community.into_active_model();
        active.credentials_ciphertext = Set(credentials_ciphertext);
        active.updated_at = Set(Utc::now().into());

        let result = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Set the lifecycle status of a community
    pub async fn set_status(
        &self,
        slug: &str,
        status: CommunityStatus,
    ) -> Result<CommunityModel, RepositoryError> {
        let community = self.require(slug).await?;

        let mut active = community.into_active_model();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now().into());

        let result = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Delete a community and, via cascade, its configuration documents
    pub async fn delete(&self, slug: &str) -> Result<(), RepositoryError> {
        let community = self.require(slug).await?;

        community
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    /// Get community count
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        Community::find()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn require(&self, slug: &str) -> Result<CommunityModel, RepositoryError> {
        self.get_by_slug(slug)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Community not found".to_string()))
    }

    /// Validate a community slug according to business rules
    fn validate_slug(&self, slug: &str) -> Result<(), RepositoryError> {
        if slug.trim().is_empty() {
            return Err(RepositoryError::validation_error(
                "Community slug cannot be empty",
            ));
        }

        if slug.len() > 64 {
            return Err(RepositoryError::validation_error(
                "Community slug cannot exceed 64 characters",
            ));
        }

        // Slugs appear in URLs; keep them lowercase alphanumeric with hyphens.
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(RepositoryError::validation_error(
                "Community slug can only contain lowercase letters, digits and hyphens",
            ));
        }

        Ok(())
    }
}
