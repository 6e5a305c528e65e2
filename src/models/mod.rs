//! # Data Models
//!
//! This module contains all the data models used throughout the Courtyard console API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod alert;
pub mod button_config;
pub mod carousel_config;
pub mod community;
pub mod principal;
pub mod session;

pub use alert::Entity as Alert;
pub use button_config::Entity as ButtonConfig;
pub use carousel_config::Entity as CarouselConfig;
pub use community::Entity as Community;
pub use principal::Entity as Principal;
pub use session::Entity as Session;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "courtyard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
