//! Community entity model
//!
//! This module contains the SeaORM entity model for the communities table.
//! A community is the tenant unit of the console; every piece of managed
//! content hangs off a community slug.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Community entity representing a managed residential community
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "communities")]
pub struct Model {
    /// URL-safe identifier, used as the tenant key (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub slug: String,

    /// Display name for the community (optional)
    pub name: Option<String>,

    /// Lifecycle status: "active" or "disabled"
    pub status: String,

    /// Encrypted backing-store credential bundle (optional)
    pub credentials_ciphertext: Option<Vec<u8>>,

    /// Timestamp when the community was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the community was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Lifecycle status of a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommunityStatus {
    Active,
    Disabled,
}

impl CommunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityStatus::Active => "active",
            CommunityStatus::Disabled => "disabled",
        }
    }

    /// Parse a stored status string. Unknown values are treated as disabled
    /// so a corrupted record can never open the door wider than intended.
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => CommunityStatus::Active,
            _ => CommunityStatus::Disabled,
        }
    }
}

impl Model {
    pub fn status(&self) -> CommunityStatus {
        CommunityStatus::parse(&self.status)
    }

    pub fn is_active(&self) -> bool {
        self.status() == CommunityStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_disabled() {
        assert_eq!(CommunityStatus::parse("active"), CommunityStatus::Active);
        assert_eq!(CommunityStatus::parse("disabled"), CommunityStatus::Disabled);
        assert_eq!(CommunityStatus::parse("???"), CommunityStatus::Disabled);
    }
}
