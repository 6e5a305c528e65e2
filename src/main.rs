//! # Courtyard Main Entry Point
//!
//! Loads configuration, initializes telemetry and the database pool, applies
//! pending migrations and starts the API server.

use courtyard::migration::{Migrator, MigratorTrait};
use courtyard::{config::ConfigLoader, db::init_pool, server::run_server, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    tracing::info!(profile = config.profile, "Configuration loaded");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(configuration = redacted_json, "Effective configuration");
    }

    let db = init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    run_server(config, db).await
}
