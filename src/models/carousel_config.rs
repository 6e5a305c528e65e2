//! Carousel configuration entity and typed document
//!
//! Each community owns at most one carousel document. The document is
//! persisted as a single JSON column and replaced wholesale on save, so
//! readers never observe a partially-updated slide list.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Carousel configuration row, one per community
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "carousel_configs")]
pub struct Model {
    /// Owning community slug (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub community_slug: String,

    /// The full carousel document as JSON
    pub document: Json,

    /// Timestamp when the document was last replaced
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Kind of media a slide displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Youtube,
}

/// Visual transition applied between slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransitionEffect {
    #[default]
    Slide,
    Fade,
    None,
}

/// What happens when playback reaches the last slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoopPolicy {
    /// Wrap from the last slide back to the first.
    #[default]
    Infinite,
    /// Reverse direction at either end (ping-pong).
    Rewind,
    /// Stop on the last slide.
    Once,
}

/// A single carousel slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CarouselItem {
    /// 1-based position in the rotation
    pub idx: u32,
    /// Media URL
    pub url: String,
    /// Media kind, derived from the URL host on save
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Whether embedded video starts playing automatically
    #[serde(default)]
    pub autoplay: bool,
}

/// Playback settings shared by all slides of a carousel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlaybackConfig {
    /// Seconds each slide stays on screen
    #[serde(default = "default_interval_seconds")]
    pub interval: u64,
    /// Transition effect between slides
    #[serde(default)]
    pub effect: TransitionEffect,
    /// End-of-rotation behavior
    #[serde(rename = "loop", default)]
    pub loop_policy: LoopPolicy,
    /// Whether navigation arrows and dots are shown
    #[serde(default = "default_nav")]
    pub nav: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            interval: default_interval_seconds(),
            effect: TransitionEffect::default(),
            loop_policy: LoopPolicy::default(),
            nav: default_nav(),
        }
    }
}

/// The complete carousel document stored per community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
pub struct CarouselDocument {
    #[serde(default)]
    pub items: Vec<CarouselItem>,
    #[serde(default)]
    pub config: PlaybackConfig,
}

fn default_interval_seconds() -> u64 {
    5
}

fn default_nav() -> bool {
    true
}
