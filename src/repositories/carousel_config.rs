//! # Carousel Configuration Repository
//!
//! Stores one carousel document per community. Saves replace the whole
//! document inside a transaction so readers never see a half-written
//! slide list.

use crate::error::RepositoryError;
use crate::models::carousel_config::{
    ActiveModel as CarouselConfigActiveModel, CarouselDocument, Entity as CarouselConfig,
    Model as CarouselConfigModel,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set, TransactionTrait,
};

/// Repository for carousel configuration documents
pub struct CarouselConfigRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CarouselConfigRepository<'a> {
    /// Create a new CarouselConfigRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Load the carousel document of a community, if one has been saved
    pub async fn get(
        &self,
        community_slug: &str,
    ) -> Result<Option<CarouselDocument>, RepositoryError> {
        let row = CarouselConfig::find_by_id(community_slug.to_string())
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        row.map(|model| Self::decode(&model)).transpose()
    }

    /// Atomically replace the carousel document of a community
    pub async fn replace(
        &self,
        community_slug: &str,
        document: &CarouselDocument,
    ) -> Result<(), RepositoryError> {
        let json = serde_json::to_value(document).map_err(|e| {
            RepositoryError::validation_error(format!("Carousel document is not valid JSON: {e}"))
        })?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let existing = CarouselConfig::find_by_id(community_slug.to_string())
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
                let active = CarouselConfigActiveModel {
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

    /// Delete the carousel document of a community
    pub async fn delete(&self, community_slug: &str) -> Result<(), RepositoryError> {
        CarouselConfig::delete_by_id(community_slug.to_string())
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    fn decode(model: &CarouselConfigModel) -> Result<CarouselDocument, RepositoryError> {
        serde_json::from_value(model.document.clone()).map_err(|e| {
            RepositoryError::Database(format!(
                "stored carousel document for '{}' is corrupt: {e}",
                model.community_slug
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::carousel_config::{CarouselItem, MediaKind, PlaybackConfig};
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

    fn sample_document() -> CarouselDocument {
        CarouselDocument {
            items: vec![CarouselItem {
                idx: 1,
                url: "https://cdn.example.com/a.jpg".to_string(),
                kind: MediaKind::Image,
                autoplay: false,
            }],
            config: PlaybackConfig::default(),
        }
    }

    #[tokio::test]
    async fn replace_then_get_round_trips() {
        let db = setup_test_db().await;
        let repo = CarouselConfigRepository::new(&db);

        assert!(repo.get("sunrise-court").await.unwrap().is_none());

        let doc = sample_document();
        repo.replace("sunrise-court", &doc).await.unwrap();

        let loaded = repo.get("sunrise-court").await.unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn replace_overwrites_previous_document() {
        let db = setup_test_db().await;
        let repo = CarouselConfigRepository::new(&db);

        repo.replace("sunrise-court", &sample_document())
            .await
            .unwrap();

        let mut second = sample_document();
        second.items.push(CarouselItem {
            idx: 2,
            url: "https://youtu.be/abc123".to_string(),
            kind: MediaKind::Youtube,
            autoplay: true,
        });
        second.config.interval = 9;
        repo.replace("sunrise-court", &second).await.unwrap();

        let loaded = repo.get("sunrise-court").await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.config.interval, 9);
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let db = setup_test_db().await;
        let repo = CarouselConfigRepository::new(&db);

        repo.replace("sunrise-court", &sample_document())
            .await
            .unwrap();
        repo.delete("sunrise-court").await.unwrap();

        assert!(repo.get("sunrise-court").await.unwrap().is_none());
    }
}
