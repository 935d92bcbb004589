//! Model backed by one PostgreSQL JSONB document table per model.

use super::{Attributes, Model};
use crate::error::ModelError;
use crate::query::{Condition, Predicate, QueryOptions, ID_KEY};
use crate::sql::{self, qualified_table, quoted, to_arguments, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;

pub struct PgModel {
    name: String,
    schema: String,
    table: String,
    pool: PgPool,
}

type Row = (i64, Value);

fn row_to_entity((id, attributes): Row) -> Value {
    let mut map = match attributes {
        Value::Object(m) => m,
        _ => Map::new(),
    };
    map.insert(ID_KEY.to_string(), Value::from(id));
    Value::Object(map)
}

/// Split an incoming attribute set into its integer id (if any) and the remaining attributes.
fn split_id(mut attributes: Attributes) -> Result<(Option<i64>, Attributes), ModelError> {
    let id = match attributes.remove(ID_KEY) {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_i64()
                .ok_or_else(|| ModelError::validation(format!("id must be an integer, got {}", v)))?,
        ),
    };
    Ok((id, attributes))
}

impl PgModel {
    /// Table is `"{schema}"."{lowercased name}"`.
    pub fn new(pool: PgPool, schema: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        let table = qualified_table(schema, &name.to_lowercase());
        PgModel {
            name,
            schema: schema.to_string(),
            table,
            pool,
        }
    }

    pub async fn ensure_table(&self) -> Result<(), ModelError> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(&self.schema)))
            .execute(&self.pool)
            .await?;
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                attributes JSONB NOT NULL DEFAULT '{{}}'::jsonb
            )
            "#,
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, ModelError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows: Vec<Row> = sqlx::query_as_with(&q.sql, to_arguments(&q.params)?)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_entity).collect())
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Value>, ModelError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row: Option<Row> = sqlx::query_as_with(&q.sql, to_arguments(&q.params)?)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_entity))
    }
}

#[async_trait]
impl Model for PgModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, predicate: &Predicate, options: &QueryOptions) -> Result<Option<Value>, ModelError> {
        let mut one = options.clone();
        one.limit = Some(1);
        if options.skip.is_none() {
            one.skip = Some(options.offset());
        }
        let cond = Condition::from_predicate(predicate)?;
        self.fetch_optional(&sql::select(&self.table, &cond, &one)).await
    }

    async fn find_many(&self, predicate: &Predicate, options: &QueryOptions) -> Result<Vec<Value>, ModelError> {
        let cond = Condition::from_predicate(predicate)?;
        self.fetch_all(&sql::select(&self.table, &cond, options)).await
    }

    async fn update(&self, predicate: &Predicate, patch: &Attributes) -> Result<Option<Value>, ModelError> {
        let cond = Condition::from_predicate(predicate)?;
        let (_, patch) = split_id(patch.clone())?;
        self.fetch_optional(&sql::update_patch(&self.table, &cond, &patch, true)).await
    }

    async fn update_many(&self, predicate: &Predicate, patch: &Attributes) -> Result<Vec<Value>, ModelError> {
        let cond = Condition::from_predicate(predicate)?;
        let (_, patch) = split_id(patch.clone())?;
        self.fetch_all(&sql::update_patch(&self.table, &cond, &patch, false)).await
    }

    async fn delete(&self, predicate: &Predicate) -> Result<Option<Value>, ModelError> {
        let cond = Condition::from_predicate(predicate)?;
        self.fetch_optional(&sql::delete(&self.table, &cond, true)).await
    }

    async fn delete_many(&self, predicate: &Predicate) -> Result<Vec<Value>, ModelError> {
        let cond = Condition::from_predicate(predicate)?;
        self.fetch_all(&sql::delete(&self.table, &cond, false)).await
    }

    async fn spawn(&self, attributes: Attributes) -> Result<Value, ModelError> {
        self.spawn_many(vec![attributes])
            .await?
            .pop()
            .ok_or_else(|| ModelError::internal(format!("{}: insert returned no row", self.name)))
    }

    /// All inserts share one transaction. Explicit ids also resync the id sequence before commit.
    async fn spawn_many(&self, items: Vec<Attributes>) -> Result<Vec<Value>, ModelError> {
        let mut statements = Vec::with_capacity(items.len());
        let mut explicit_ids = false;
        for item in items {
            let (id, attributes) = split_id(item)?;
            explicit_ids |= id.is_some();
            statements.push(sql::insert(&self.table, id, &attributes));
        }
        let mut out = Vec::with_capacity(statements.len());
        let mut tx = self.pool.begin().await?;
        for q in &statements {
            tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
            let row: Row = sqlx::query_as_with(&q.sql, to_arguments(&q.params)?)
                .fetch_one(&mut *tx)
                .await?;
            out.push(row_to_entity(row));
        }
        if explicit_ids {
            let q = sql::sync_id_sequence(&self.table);
            tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
            sqlx::query_with(&q.sql, to_arguments(&q.params)?)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(out)
    }

    async fn persist(&self, entity: Attributes) -> Result<Value, ModelError> {
        let (id, attributes) = split_id(entity)?;
        let id = id.ok_or_else(|| ModelError::validation("entity to persist has no id"))?;
        self.fetch_optional(&sql::replace(&self.table, id, &attributes))
            .await?
            .ok_or_else(|| ModelError::not_found(format!("{} {} not found", self.name, id)))
    }
}
