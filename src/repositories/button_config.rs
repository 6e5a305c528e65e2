//! # Button Configuration Repository
//!
//! Stores the two fixed button grids of a community as one JSON document,
//! replaced wholesale on save.

use crate::error::RepositoryError;
use crate::models::button_config::{
    ActiveModel as ButtonConfigActiveModel, ButtonDocument, Entity as ButtonConfig,
    Model as ButtonConfigModel,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set, TransactionTrait,
};

/// Repository for button configuration documents
pub struct ButtonConfigRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ButtonConfigRepository<'a> {
    /// Create a new ButtonConfigRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Load the button document of a community, if one has been saved
    pub async fn get(
        &self,
        community_slug: &str,
    ) -> Result<Option<ButtonDocument>, RepositoryError> {
        let row = ButtonConfig::find_by_id(community_slug.to_string())
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        row.map(|model| Self::decode(&model)).transpose()
    }

    /// Atomically replace the button document of a community
    pub async fn replace(
        &self,
        community_slug: &str,
        document: &ButtonDocument,
    ) -> Result<(), RepositoryError> {
        let json = serde_json::to_value(document).map_err(|e| {
            RepositoryError::validation_error(format!("Button document is not valid JSON: {e}"))
        })?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let existing = ButtonConfig::find_by_id(community_slug.to_string())
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        match existing {
            Some(model) => {
                let mut active = model.into_active_model();
                active.document = Set(json);
                active.updated_at = Set(Utc::now().into());
                active
                    .update(&txn)
                    .await
                    .map_err(RepositoryError::database_error)?;
            }
            None => {
                let active = ButtonConfigActiveModel {
                    community_slug: Set(community_slug.to_string()),
                    document: Set(json),
                    updated_at: Set(Utc::now().into()),
                };
                active
                    .insert(&txn)
                    .await
                    .map_err(RepositoryError::database_error)?;
            }
        }

        txn.commit().await.map_err(RepositoryError::database_error)
    }

    /// Delete the button document of a community
    pub async fn delete(&self, community_slug: &str) -> Result<(), RepositoryError> {
        ButtonConfig::delete_by_id(community_slug.to_string())
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    fn decode(model: &ButtonConfigModel) -> Result<ButtonDocument, RepositoryError> {
        serde_json::from_value(model.document.clone()).map_err(|e| {
            RepositoryError::Database(format!(
                "stored button document for '{}' is corrupt: {e}",
                model.community_slug
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::button_config::{BUTTON_SLOTS, ButtonSlot};
    use crate::repositories::community::{CommunityRepository, CreateCommunityRequest};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        CommunityRepository::new(&db)
            .create(CreateCommunityRequest {
                slug: "sunrise-court".to_string(),
                name: None,
                credentials_ciphertext: None,
            })
            .await
            .unwrap();

        db
    }

    #[tokio::test]
    async fn replace_then_get_round_trips() {
        let db = setup_test_db().await;
        let repo = ButtonConfigRepository::new(&db);

        let mut doc = ButtonDocument::default();
        doc.a6[0] = ButtonSlot {
            idx: 1,
            text: "訪客登記".to_string(),
            link: "https://example.com/visitors".to_string(),
            new_window: false,
            icon_url: None,
        };

        repo.replace("sunrise-court", &doc).await.unwrap();

        let loaded = repo.get("sunrise-court").await.unwrap().unwrap();
        assert_eq!(loaded.a6.len(), BUTTON_SLOTS);
        assert_eq!(loaded.a6[0].text, "訪客登記");
        assert!(loaded.a8.iter().all(ButtonSlot::is_empty));
    }

    #[tokio::test]
    async fn missing_document_reads_as_none() {
        let db = setup_test_db().await;
        let repo = ButtonConfigRepository::new(&db);

        assert!(repo.get("sunrise-court").await.unwrap().is_none());
    }
}
