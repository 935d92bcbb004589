//! Builds parameterized SELECT, INSERT, UPDATE, DELETE over a JSONB document table
//! (`id BIGSERIAL`, `attributes JSONB`).

use super::SqlParam;
use crate::query::{Comparison, Condition, QueryOptions, SortDirection, ID_KEY};
use serde_json::{Map, Value};

const COLUMNS: &str = "id, attributes";

/// Quote identifier for PostgreSQL (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryBuf {
    fn push_param(&mut self, v: SqlParam) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// JSONB expression addressing one attribute path; `id` is the key column.
fn field_expr(q: &mut QueryBuf, path: &[String]) -> String {
    if path.len() == 1 && path[0] == ID_KEY {
        "to_jsonb(id)".to_string()
    } else {
        let n = q.push_param(SqlParam::Path(path.to_vec()));
        format!("(attributes #> ${}::text[])", n)
    }
}

fn condition_sql(q: &mut QueryBuf, cond: &Condition) -> String {
    match cond {
        Condition::All(parts) if parts.is_empty() => "TRUE".to_string(),
        Condition::Any(parts) if parts.is_empty() => "FALSE".to_string(),
        Condition::All(parts) => joined(q, parts, " AND "),
        Condition::Any(parts) => joined(q, parts, " OR "),
        Condition::Not(inner) => format!("NOT ({})", condition_sql(q, inner)),
        Condition::Field { path, op, value } => field_sql(q, path, *op, value),
    }
}

fn joined(q: &mut QueryBuf, parts: &[Condition], sep: &str) -> String {
    let sql: Vec<String> = parts.iter().map(|c| condition_sql(q, c)).collect();
    format!("({})", sql.join(sep))
}

fn field_sql(q: &mut QueryBuf, path: &[String], op: Comparison, value: &Value) -> String {
    let x = field_expr(q, path);
    match op {
        Comparison::Exists => {
            if value.as_bool().unwrap_or(true) {
                format!("{} IS NOT NULL", x)
            } else {
                format!("{} IS NULL", x)
            }
        }
        Comparison::Like => {
            let n = q.push_param(SqlParam::Text(value.as_str().unwrap_or_default().to_string()));
            format!("(jsonb_typeof({x}) = 'string' AND ({x} #>> '{{}}') LIKE ${n})", x = x, n = n)
        }
        _ => {
            let n = q.push_param(SqlParam::Json(value.clone()));
            match op {
                Comparison::Eq => format!("{} = ${}", x, n),
                Comparison::Ne => format!("{} IS DISTINCT FROM ${}", x, n),
                Comparison::In => format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements(${}) AS e(v) WHERE e.v = {})",
                    n, x
                ),
                Comparison::Nin => format!(
                    "NOT EXISTS (SELECT 1 FROM jsonb_array_elements(${}) AS e(v) WHERE e.v = {})",
                    n, x
                ),
                _ => {
                    let cmp = match op {
                        Comparison::Gt => ">",
                        Comparison::Gte => ">=",
                        Comparison::Lt => "<",
                        _ => "<=",
                    };
                    // jsonb orders across types; only compare like with like
                    format!("(jsonb_typeof({x}) = jsonb_typeof(${n}) AND {x} {cmp} ${n})", x = x, n = n, cmp = cmp)
                }
            }
        }
    }
}

fn order_clause(q: &mut QueryBuf, options: &QueryOptions) -> String {
    let mut parts = Vec::new();
    if let Some(sort) = &options.sort {
        for key in sort.keys() {
            let path: Vec<String> = key.field.split('.').map(str::to_string).collect();
            let expr = field_expr(q, &path);
            let nulls = match key.direction {
                SortDirection::Asc => "NULLS FIRST",
                SortDirection::Desc => "NULLS LAST",
            };
            parts.push(format!("{} {} {}", expr, key.direction.to_sql(), nulls));
        }
    }
    parts.push("id ASC".to_string());
    format!("ORDER BY {}", parts.join(", "))
}

/// Matching rows with sort, skip/page, and limit applied.
pub fn select(table: &str, cond: &Condition, options: &QueryOptions) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_sql = condition_sql(&mut q, cond);
    let order = order_clause(&mut q, options);
    let mut sql = format!("SELECT {} FROM {} WHERE {} {}", COLUMNS, table, where_sql, order);
    if let Some(limit) = options.limit {
        let n = q.push_param(SqlParam::count(limit));
        sql.push_str(&format!(" LIMIT ${}", n));
    }
    let offset = options.offset();
    if offset > 0 {
        let n = q.push_param(SqlParam::count(offset));
        sql.push_str(&format!(" OFFSET ${}", n));
    }
    q.sql = sql;
    q
}

/// Row filter for writes: every match, or only the lowest-id match.
fn target(q: &mut QueryBuf, table: &str, cond: &Condition, first_only: bool) -> String {
    let where_sql = condition_sql(q, cond);
    if first_only {
        format!("id = (SELECT id FROM {} WHERE {} ORDER BY id LIMIT 1)", table, where_sql)
    } else {
        where_sql
    }
}

/// Merge `patch` into the attributes of the targeted rows.
pub fn update_patch(table: &str, cond: &Condition, patch: &Map<String, Value>, first_only: bool) -> QueryBuf {
    let mut q = QueryBuf::default();
    let n = q.push_param(SqlParam::Json(Value::Object(patch.clone())));
    let target = target(&mut q, table, cond, first_only);
    q.sql = format!(
        "UPDATE {} SET attributes = attributes || ${} WHERE {} RETURNING {}",
        table, n, target, COLUMNS
    );
    q
}

pub fn delete(table: &str, cond: &Condition, first_only: bool) -> QueryBuf {
    let mut q = QueryBuf::default();
    let target = target(&mut q, table, cond, first_only);
    q.sql = format!("DELETE FROM {} WHERE {} RETURNING {}", table, target, COLUMNS);
    q
}

pub fn insert(table: &str, id: Option<i64>, attributes: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let attrs = SqlParam::Json(Value::Object(attributes.clone()));
    q.sql = match id {
        Some(id) => {
            let i = q.push_param(SqlParam::Int(id));
            let a = q.push_param(attrs);
            format!("INSERT INTO {} (id, attributes) VALUES (${}, ${}) RETURNING {}", table, i, a, COLUMNS)
        }
        None => {
            let a = q.push_param(attrs);
            format!("INSERT INTO {} (attributes) VALUES (${}) RETURNING {}", table, a, COLUMNS)
        }
    };
    q
}

/// Move the `id` sequence past the largest stored id, so later generated ids do not collide
/// with explicitly inserted ones.
pub fn sync_id_sequence(table: &str) -> QueryBuf {
    let mut q = QueryBuf::default();
    let n = q.push_param(SqlParam::Text(table.to_string()));
    q.sql = format!(
        "SELECT setval(pg_get_serial_sequence(${}, 'id'), (SELECT COALESCE(MAX(id), 0) + 1 FROM {}), false)",
        n, table
    );
    q
}

/// Overwrite the whole attribute set of one row.
pub fn replace(table: &str, id: i64, attributes: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let a = q.push_param(SqlParam::Json(Value::Object(attributes.clone())));
    let i = q.push_param(SqlParam::Int(id));
    q.sql = format!("UPDATE {} SET attributes = ${} WHERE id = ${} RETURNING {}", table, a, i, COLUMNS);
    q
}
