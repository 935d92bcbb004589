//! Example consumer: serves the generated REST surface for a small model registry.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! With `DATABASE_URL` set models are stored in PostgreSQL, otherwise in memory.

use axum::Router;
use model_rest::{
    common_routes, configure, ensure_database_exists, load_from_path, mount_routes, pg_registry, AppState,
    MemoryModel, ModelRegistry, ResourceConfig,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("model_rest=info")),
        )
        .init();

    let names: Vec<String> = std::env::var("MODEL_NAMES")
        .unwrap_or_else(|_| "User,Pet".into())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let registry = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            ensure_database_exists(&database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            pg_registry(&pool, &names).await?
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using in-memory models");
            let mut registry = ModelRegistry::new();
            for name in &names {
                registry.register(Arc::new(MemoryModel::new(name.clone())));
            }
            registry
        }
    };

    let config = match std::env::var("CONFIG_PATH") {
        Ok(path) => load_from_path(path).await?,
        Err(_) => ResourceConfig::default(),
    }
    .apply_env_overrides();
    let resources = configure(&config, &registry)?;
    let state = AppState::new(resources);

    let app = Router::new().merge(common_routes()).merge(mount_routes(state));
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Example consumer listening on http://{}{}", listener.local_addr()?, config.prefix);
    axum::serve(listener, app).await?;
    Ok(())
}
