//! Database bootstrap for the PostgreSQL adapter. Model tables live in a schema named from
//! `MODEL_REST_SCHEMA` env (default `model_rest`).

use crate::error::ModelError;
use crate::model::{ModelRegistry, PgModel};
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;

/// Schema name for model tables. From env `MODEL_REST_SCHEMA`, default `model_rest`.
pub fn model_schema() -> String {
    std::env::var("MODEL_REST_SCHEMA").unwrap_or_else(|_| "model_rest".into())
}

/// One `PgModel` per name, each with its table ensured.
pub async fn pg_registry<S: AsRef<str>>(pool: &PgPool, names: &[S]) -> Result<ModelRegistry, ModelError> {
    let schema = model_schema();
    let mut registry = ModelRegistry::new();
    for name in names {
        let model = PgModel::new(pool.clone(), &schema, name.as_ref());
        model.ensure_table().await?;
        tracing::debug!(model = %name.as_ref(), schema = %schema, "model table ready");
        registry.register(Arc::new(model));
    }
    Ok(registry)
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), ModelError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| ModelError::internal(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), ModelError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| ModelError::internal("DATABASE_URL: no path"))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
