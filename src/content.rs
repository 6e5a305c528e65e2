//! # Content Configuration
//!
//! Loading and saving of the per-community carousel and button documents.
//! Reads walk a fallback chain (community, then deployment default, then an
//! explicit empty document) so a freshly provisioned community still renders.
//! Saves sanitize the document before it replaces the stored one.

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::config::CarouselTimingConfig;
use crate::error::ApiError;
use crate::models::button_config::{BUTTON_SLOTS, ButtonDocument, ButtonSlot};
use crate::models::carousel_config::{CarouselDocument, MediaKind};
use crate::repositories::{ButtonConfigRepository, CarouselConfigRepository};

/// Where a served document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// The community's own saved document
    Community,
    /// The deployment default community's document
    DefaultFallback,
    /// No document anywhere in the chain; an empty one was served
    Empty,
}

/// Classify a media URL by host. YouTube hosts (including short links)
/// become embedded video; everything else is treated as an image.
pub fn classify_media(url: &str) -> MediaKind {
    const YOUTUBE_HOSTS: &[&str] = &[
        "youtube.com",
        "www.youtube.com",
        "m.youtube.com",
        "youtu.be",
    ];

    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if YOUTUBE_HOSTS.contains(&host) => MediaKind::Youtube,
            _ => MediaKind::Image,
        },
        Err(_) => MediaKind::Image,
    }
}

/// Sanitize a carousel document before it is stored.
///
/// Slides with an empty URL are dropped, media kinds are re-derived from
/// the URL (clients cannot vouch for their own classification), indices are
/// rewritten to a dense 1..N, the slide list is capped, and the interval is
/// clamped up to the deployment floor.
pub fn sanitize_carousel(
    mut document: CarouselDocument,
    timing: &CarouselTimingConfig,
) -> CarouselDocument {
    document.items.retain(|item| !item.url.trim().is_empty());
    document.items.truncate(timing.max_slides);

    for (position, item) in document.items.iter_mut().enumerate() {
        item.url = item.url.trim().to_string();
        item.kind = classify_media(&item.url);
        item.idx = position as u32 + 1;
        // Autoplay only means something for embedded video.
        if item.kind == MediaKind::Image {
            item.autoplay = false;
        }
    }

    document.config.interval = document.config.interval.max(timing.min_interval_seconds);

    document
}

/// Sanitize a button document before it is stored. Both grids are forced to
/// exactly [`BUTTON_SLOTS`] entries with dense 1..N indices; surplus entries
/// are dropped and missing ones padded with empty slots.
pub fn sanitize_buttons(mut document: ButtonDocument) -> ButtonDocument {
    for grid in [&mut document.a6, &mut document.a8] {
        grid.truncate(BUTTON_SLOTS);
        while grid.len() < BUTTON_SLOTS {
            grid.push(ButtonSlot::empty(0));
        }

        for (position, slot) in grid.iter_mut().enumerate() {
            slot.idx = position as u32 + 1;
            slot.text = slot.text.trim().to_string();
            slot.link = slot.link.trim().to_string();
            if let Some(icon) = slot.icon_url.take() {
                let trimmed = icon.trim().to_string();
                if !trimmed.is_empty() {
                    slot.icon_url = Some(trimmed);
                }
            }
            // A slot without a target is fully cleared.
            if slot.link.is_empty() && slot.text.is_empty() {
                *slot = ButtonSlot::empty(position as u32 + 1);
            }
        }
    }

    document
}

/// Load the carousel document for a community, walking the fallback chain.
pub async fn load_carousel(
    db: &DatabaseConnection,
    community_slug: &str,
    default_slug: &str,
) -> Result<(CarouselDocument, ContentSource), ApiError> {
    let repo = CarouselConfigRepository::new(db);

    if let Some(document) = repo.get(community_slug).await? {
        return Ok((document, ContentSource::Community));
    }

    if community_slug != default_slug
        && let Some(document) = repo.get(default_slug).await?
    {
        tracing::debug!(
            community_slug,
            "No carousel document; serving deployment default"
        );
        return Ok((document, ContentSource::DefaultFallback));
    }

    Ok((CarouselDocument::default(), ContentSource::Empty))
}

/// Sanitize and atomically store a community's carousel document, returning
/// what was actually written.
pub async fn save_carousel(
    db: &DatabaseConnection,
    community_slug: &str,
    document: CarouselDocument,
    timing: &CarouselTimingConfig,
) -> Result<CarouselDocument, ApiError> {
    let sanitized = sanitize_carousel(document, timing);

    CarouselConfigRepository::new(db)
        .replace(community_slug, &sanitized)
        .await?;

    Ok(sanitized)
}

/// Load the button document for a community, walking the fallback chain.
pub async fn load_buttons(
    db: &DatabaseConnection,
    community_slug: &str,
    default_slug: &str,
) -> Result<(ButtonDocument, ContentSource), ApiError> {
    let repo = ButtonConfigRepository::new(db);

    if let Some(document) = repo.get(community_slug).await? {
        return Ok((document, ContentSource::Community));
    }

    if community_slug != default_slug
        && let Some(document) = repo.get(default_slug).await?
    {
        tracing::debug!(
            community_slug,
            "No button document; serving deployment default"
        );
        return Ok((document, ContentSource::DefaultFallback));
    }

    Ok((ButtonDocument::default(), ContentSource::Empty))
}

/// Sanitize and atomically store a community's button document, returning
/// what was actually written.
pub async fn save_buttons(
    db: &DatabaseConnection,
    community_slug: &str,
    document: ButtonDocument,
) -> Result<ButtonDocument, ApiError> {
    let sanitized = sanitize_buttons(document);

    ButtonConfigRepository::new(db)
        .replace(community_slug, &sanitized)
        .await?;

    Ok(sanitized)
}
