//! Database migrations for the Courtyard console service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_01_000001_create_communities;
mod m2025_06_01_000100_create_principals;
mod m2025_06_01_000200_create_sessions;
mod m2025_06_01_000300_create_carousel_configs;
mod m2025_06_01_000400_create_button_configs;
mod m2025_06_01_000500_create_alerts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_01_000001_create_communities::Migration),
            Box::new(m2025_06_01_000100_create_principals::Migration),
            Box::new(m2025_06_01_000200_create_sessions::Migration),
            Box::new(m2025_06_01_000300_create_carousel_configs::Migration),
            Box::new(m2025_06_01_000400_create_button_configs::Migration),
            Box::new(m2025_06_01_000500_create_alerts::Migration),
        ]
    }
}
