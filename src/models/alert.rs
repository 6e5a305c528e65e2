//! Alert entity model
//!
//! Emergency alerts raised by residents and worked by community admins.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Alert entity representing a resident-submitted emergency signal
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    /// Unique identifier for the alert (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Community the alert was raised in
    pub community_slug: String,

    /// Unit or address the alert concerns
    pub unit: String,

    /// Principal that raised the alert
    pub submitter_id: Uuid,

    /// Submitter display name snapshot (optional)
    pub submitter_name: Option<String>,

    /// Submitter phone snapshot (optional)
    pub submitter_phone: Option<String>,

    /// Workflow status: "active", "acknowledged" or "resolved"
    pub status: String,

    /// Timestamp when the alert was raised
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the alert last changed status
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Workflow status of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(AlertStatus::Active),
            "acknowledged" => Some(AlertStatus::Acknowledged),
            "resolved" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }

    /// Whether an alert may move from `self` to `next`. The workflow only
    /// moves forward: active -> acknowledged -> resolved.
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Active, AlertStatus::Acknowledged)
                | (AlertStatus::Active, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_only_moves_forward() {
        assert!(AlertStatus::Active.can_transition_to(AlertStatus::Acknowledged));
        assert!(AlertStatus::Active.can_transition_to(AlertStatus::Resolved));
        assert!(AlertStatus::Acknowledged.can_transition_to(AlertStatus::Resolved));

        assert!(!AlertStatus::Resolved.can_transition_to(AlertStatus::Active));
        assert!(!AlertStatus::Acknowledged.can_transition_to(AlertStatus::Active));
        assert!(!AlertStatus::Resolved.can_transition_to(AlertStatus::Acknowledged));
    }
}
