//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities, providing a clean API for data access with community-scoped methods.

pub mod alert;
pub mod button_config;
pub mod carousel_config;
pub mod community;
pub mod principal;
pub mod session;

pub use alert::AlertRepository;
pub use button_config::ButtonConfigRepository;
pub use carousel_config::CarouselConfigRepository;
pub use community::CommunityRepository;
pub use principal::PrincipalRepository;
pub use session::SessionRepository;
