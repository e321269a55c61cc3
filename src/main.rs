//! # Pressrelay API Main Entry Point

use migration::MigratorTrait;
use pressrelay::{config::ConfigLoader, db, server::run_server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new().load()?;

    telemetry::init_tracing(&config)?;
    tracing::info!(profile = %config.profile, "loaded configuration");
    tracing::info!(config = %config.redacted_json(), "effective configuration");

    let pool = db::init_pool(&config).await?;
    migration::Migrator::up(&pool, None).await?;

    run_server(config, pool).await
}
