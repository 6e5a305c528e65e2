//! Session entity model
//!
//! Stores the SHA-256 digest of each issued bearer token. The raw token is
//! returned to the client once at sign-in and never persisted.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Session entity representing an issued bearer token
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    /// Hex-encoded SHA-256 digest of the bearer token (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub token_digest: String,

    /// Principal the session belongs to
    pub principal_id: Uuid,

    /// Timestamp when the session was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp after which the session is rejected
    pub expires_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
