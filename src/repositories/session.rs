//! # Session Repository
//!
//! Repository implementation for Session rows. Only token digests are
//! stored; callers hash the bearer token before lookup.

use crate::error::RepositoryError;
use crate::models::session::{
    ActiveModel as SessionActiveModel, Column as SessionColumn, Entity as Session,
    Model as SessionModel,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

/// Repository for Session database operations
pub struct SessionRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SessionRepository<'a> {
    /// Create a new SessionRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record a newly issued session
    pub async fn create(
        &self,
        token_digest: String,
        principal_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionModel, RepositoryError> {
        if token_digest.is_empty() {
            return Err(RepositoryError::validation_error(
                "Session token digest cannot be empty",
            ));
        }

        let session = SessionActiveModel {
            token_digest: Set(token_digest),
            principal_id: Set(principal_id),
            created_at: Set(Utc::now().into()),
            expires_at: Set(expires_at.into()),
        };

        let result = session
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Find a session by its token digest, regardless of expiry
    pub async fn find_by_digest(
        &self,
        token_digest: &str,
    ) -> Result<Option<SessionModel>, RepositoryError> {
        let session = Session::find_by_id(token_digest.to_string())
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(session)
    }

    /// Revoke a single session
    pub async fn revoke(&self, token_digest: &str) -> Result<(), RepositoryError> {
        Session::delete_by_id(token_digest.to_string())
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    /// Revoke every session belonging to a principal. Used when an account
    /// is disabled or its password changes.
    pub async fn revoke_for_principal(&self, principal_id: Uuid) -> Result<u64, RepositoryError> {
        let result = Session::delete_many()
            .filter(SessionColumn::PrincipalId.eq(principal_id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }

    /// Delete sessions whose expiry has passed
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = Session::delete_many()
            .filter(SessionColumn::ExpiresAt.lt(now))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::repositories::principal::{CreatePrincipalRequest, PrincipalRepository};
    use chrono::Duration;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_principal(db: &DatabaseConnection) -> Uuid {
        let repo = PrincipalRepository::new(db);
        repo.create(CreatePrincipalRequest {
            email: "session@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            display_name: None,
            phone: None,
            photo_url: None,
            role: Role::Resident,
            community_slug: None,
            household: None,
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn create_find_revoke() {
        let db = setup_test_db().await;
        let principal_id = seed_principal(&db).await;
        let repo = SessionRepository::new(&db);

        let expires = Utc::now() + Duration::hours(1);
        repo.create("digest-a".to_string(), principal_id, expires)
            .await
            .unwrap();

        assert!(repo.find_by_digest("digest-a").await.unwrap().is_some());
        assert!(repo.find_by_digest("digest-b").await.unwrap().is_none());

        repo.revoke("digest-a").await.unwrap();
        assert!(repo.find_by_digest("digest-a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revoke_for_principal_clears_all_sessions() {
        let db = setup_test_db().await;
        let principal_id = seed_principal(&db).await;
        let repo = SessionRepository::new(&db);

        let expires = Utc::now() + Duration::hours(1);
        repo.create("d1".to_string(), principal_id, expires)
            .await
            .unwrap();
        repo.create("d2".to_string(), principal_id, expires)
            .await
            .unwrap();

        let revoked = repo.revoke_for_principal(principal_id).await.unwrap();
        assert_eq!(revoked, 2);
        assert!(repo.find_by_digest("d1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_expired_sessions() {
        let db = setup_test_db().await;
        let principal_id = seed_principal(&db).await;
        let repo = SessionRepository::new(&db);

        repo.create(
            "stale".to_string(),
            principal_id,
            Utc::now() - Duration::hours(1),
        )
        .await
        .unwrap();
        repo.create(
            "fresh".to_string(),
            principal_id,
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap();

        let purged = repo.purge_expired(Utc::now()).await.unwrap();
        assert_eq!(purged, 1);
        assert!(repo.find_by_digest("stale").await.unwrap().is_none());
        assert!(repo.find_by_digest("fresh").await.unwrap().is_some());
    }
}
