//! Button configuration entity and typed document
//!
//! Two fixed-length button grids per community ("a6" and "a8", eight slots
//! each), persisted as one JSON column and replaced wholesale on save.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Number of slots in each button grid.
pub const BUTTON_SLOTS: usize = 8;

/// Button configuration row, one per community
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "button_configs")]
pub struct Model {
    /// Owning community slug (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub community_slug: String,

    /// The full button document as JSON
    pub document: Json,

    /// Timestamp when the document was last replaced
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A single button slot. An empty `text` and `link` means the slot is unused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ButtonSlot {
    /// 1-based position in the grid
    pub idx: u32,
    /// Button label
    #[serde(default)]
    pub text: String,
    /// Target URL the button opens
    #[serde(default)]
    pub link: String,
    /// Whether the link opens in a new window
    #[serde(rename = "newWindow", default)]
    pub new_window: bool,
    /// Optional icon image URL
    #[serde(rename = "iconUrl", default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

impl ButtonSlot {
    /// An unused slot at the given 1-based position.
    pub fn empty(idx: u32) -> Self {
        Self {
            idx,
            text: String::new(),
            link: String::new(),
            new_window: false,
            icon_url: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.link.trim().is_empty()
    }
}

/// The complete button document stored per community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ButtonDocument {
    /// Grid shown on the six-button layout
    #[serde(default)]
    pub a6: Vec<ButtonSlot>,
    /// Grid shown on the eight-button layout
    #[serde(default)]
    pub a8: Vec<ButtonSlot>,
}

impl Default for ButtonDocument {
    fn default() -> Self {
        Self {
            a6: (1..=BUTTON_SLOTS as u32).map(ButtonSlot::empty).collect(),
            a8: (1..=BUTTON_SLOTS as u32).map(ButtonSlot::empty).collect(),
        }
    }
}
