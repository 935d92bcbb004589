//! Typed bind values for generated statements.

use crate::error::ModelError;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::Arguments;

/// A value bound to a PostgreSQL placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    /// Bound as JSONB.
    Json(Value),
    Int(i64),
    Text(String),
    /// Attribute path for `#>`, bound as TEXT[].
    Path(Vec<String>),
}

impl SqlParam {
    /// u64 option values clamp to the BIGINT range.
    pub fn count(n: u64) -> Self {
        SqlParam::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

pub fn to_arguments(params: &[SqlParam]) -> Result<PgArguments, ModelError> {
    let mut args = PgArguments::default();
    for p in params {
        let added = match p {
            SqlParam::Json(v) => args.add(sqlx::types::Json(v.clone())),
            SqlParam::Int(n) => args.add(*n),
            SqlParam::Text(s) => args.add(s.clone()),
            SqlParam::Path(path) => args.add(path.clone()),
        };
        added.map_err(|e| ModelError::internal(format!("bind: {}", e)))?;
    }
    Ok(args)
}
