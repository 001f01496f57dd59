// Reelbase - database bootstrap: migrate and seed the catalog

use std::path::Path;

use tracing::{error, info};

use reelbase_app::{load_seed_file, seed_films, Database};
use reelbase_common::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.rust_log)),
        )
        .init();

    info!(app_env = %config.app_env, "Starting Reelbase");

    let database = Database::connect(&config).await.map_err(|e| {
        error!("Failed to connect to database: {}", e);
        anyhow::anyhow!("Database connection failed: {}", e)
    })?;

    let result = bootstrap(&database, &config).await;
    database.close().await;

    if let Err(e) = &result {
        error!("Bootstrap failed: {:#}", e);
    }
    result
}

async fn bootstrap(database: &Database, config: &Config) -> anyhow::Result<()> {
    database.migrate().await?;

    let Some(seed_file) = &config.seed_file else {
        info!("SEED_FILE not set, skipping catalog seeding");
        return Ok(());
    };

    let films = load_seed_file(Path::new(seed_file))?;
    let repos = database.repositories();
    let inserted = seed_films(&repos.catalog.films, films).await?;

    info!(inserted, "Bootstrap complete");
    Ok(())
}
