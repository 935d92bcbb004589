//! Generated resource handlers. The path segment picks the binding; the verb picks the operation.

use crate::error::AppError;
use crate::query::{parse, ID_KEY};
use crate::response::respond;
use crate::service::{Action, CrudDispatcher};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::Method,
    response::Response,
};
use serde_json::Value;
use std::collections::HashMap;

/// `/{singular}/{id}` segment: integers become numbers, anything else stays a string.
fn id_value(id: &str) -> Value {
    match id.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(id.to_string()),
    }
}

fn decode_body(body: &Bytes) -> Result<Option<Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
}

/// `/{singular}` or `/{plural}`.
pub async fn resource(
    State(state): State<AppState>,
    method: Method,
    Path(segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, AppError> {
    run(&state, &method, &segment, None, &params, &body).await
}

/// `/{singular}/{id}`.
pub async fn resource_by_id(
    State(state): State<AppState>,
    method: Method,
    Path((segment, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, AppError> {
    run(&state, &method, &segment, Some(&id), &params, &body).await
}

async fn run(
    state: &AppState,
    method: &Method,
    segment: &str,
    id: Option<&str>,
    params: &HashMap<String, String>,
    body: &Bytes,
) -> Result<Response, AppError> {
    let action = Action::from_method(method)
        .ok_or_else(|| AppError::BadRequest(format!("unsupported method {}", method)))?;
    let (binding, shape) = state
        .resources
        .lookup(segment)
        .ok_or_else(|| AppError::NotFound(format!("/{}", segment)))?;
    if id.is_some() && shape == crate::config::Shape::Plural {
        return Err(AppError::NotFound(format!("/{}/{{id}}", segment)));
    }

    let mut query = parse(params).map_err(|e| {
        tracing::warn!(error = %e, segment, "rejected query string");
        e
    })?;
    if let Some(id) = id {
        query.predicate.insert(ID_KEY.to_string(), id_value(id));
    }
    let body = match action {
        Action::Read | Action::Delete => None,
        Action::CreateOrUpdate | Action::ReplaceOrCreate => decode_body(body)?,
    };

    let outcome = CrudDispatcher::dispatch(binding.model.as_ref(), shape, action, query, body).await?;
    Ok(respond(action, outcome))
}
