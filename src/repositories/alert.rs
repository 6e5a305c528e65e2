//! # Alert Repository
//!
//! Repository implementation for resident emergency alerts. Status changes
//! are validated against the forward-only workflow before they are written.

use crate::error::RepositoryError;
use crate::models::alert::{
    ActiveModel as AlertActiveModel, AlertStatus, Column as AlertColumn, Entity as Alert,
    Model as AlertModel,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

/// Request data for raising a new alert
#[derive(Debug, Clone)]
pub struct CreateAlertRequest {
    pub community_slug: String,
    pub unit: String,
    pub submitter_id: Uuid,
    pub submitter_name: Option<String>,
    pub submitter_phone: Option<String>,
}

/// Repository for Alert database operations
pub struct AlertRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> AlertRepository<'a> {
    /// Create a new AlertRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Raise a new alert
    pub async fn create(&self, request: CreateAlertRequest) -> Result<AlertModel, RepositoryError> {
        if request.unit.trim().is_empty() {
            return Err(RepositoryError::validation_error(
                "Alert unit cannot be empty",
            ));
        }

        let now = Utc::now();

        let alert = AlertActiveModel {
            id: Set(Uuid::new_v4()),
            community_slug: Set(request.community_slug),
            unit: Set(request.unit),
            submitter_id: Set(request.submitter_id),
            submitter_name: Set(request.submitter_name),
            submitter_phone: Set(request.submitter_phone),
            status: Set(AlertStatus::Active.as_str().to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let result = alert
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }

    /// Find an alert by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AlertModel>, RepositoryError> {
        let alert = Alert::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(alert)
    }

    /// List alerts of a community, newest first
    pub async fn list_by_community(
        &self,
        community_slug: &str,
    ) -> Result<Vec<AlertModel>, RepositoryError> {
        let alerts = Alert::find()
            .filter(AlertColumn::CommunitySlug.eq(community_slug))
            .order_by_desc(AlertColumn::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(alerts)
    }

    /// List alerts of a community that have not been resolved
    pub async fn list_open_by_community(
        &self,
        community_slug: &str,
    ) -> Result<Vec<AlertModel>, RepositoryError> {
        let alerts = Alert::find()
            .filter(AlertColumn::CommunitySlug.eq(community_slug))
            .filter(AlertColumn::Status.ne(AlertStatus::Resolved.as_str()))
            .order_by_desc(AlertColumn::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(alerts)
    }

    /// Move an alert to a new workflow status
    pub async fn transition(
        &self,
        id: Uuid,
        next: AlertStatus,
    ) -> Result<AlertModel, RepositoryError> {
        let alert = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Alert not found".to_string()))?;

        let current = AlertStatus::parse(&alert.status).ok_or_else(|| {
            RepositoryError::Database(format!("alert {id} has unknown status '{}'", alert.status))
        })?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "Alert cannot move from '{}' to '{}'",
                current.as_str(),
                next.as_str()
            )));
        }

        let mut active = alert.into_active_model();
        active.status = Set(next.as_str().to_string());
        active.updated_at = Set(Utc::now().into());

        let result = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result)
    }
}
