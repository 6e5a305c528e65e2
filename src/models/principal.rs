//! Principal entity model
//!
//! A principal is any authenticated account: system administrators,
//! community administrators and residents. Role and status are stored as
//! strings; the closed enums live in [`crate::auth`].

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Principal entity representing an authenticated account
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "principals")]
pub struct Model {
    /// Unique identifier for the principal (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Sign-in email, unique across the deployment
    pub email: String,

    /// Argon2id PHC-format password hash
    pub password_hash: String,

    /// Display name (optional)
    pub display_name: Option<String>,

    /// Contact phone number (optional)
    pub phone: Option<String>,

    /// Avatar URL; may be a stored-media URL or an inline data URL
    pub photo_url: Option<String>,

    /// Role string: "system_admin", "community_admin" or "resident"
    pub role: String,

    /// Account status string: "active" or "disabled"
    pub status: String,

    /// Slug of the community this account belongs to (optional)
    pub community_slug: Option<String>,

    /// Household details captured by bulk import (unit, floor, notes)
    pub household: Option<Json>,

    /// Timestamp when the principal was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the principal was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
