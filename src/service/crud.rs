//! Verb dispatch: picks the model-layer operation(s) for a route shape, HTTP action and parsed query.

use crate::config::Shape;
use crate::error::{AppError, ModelError};
use crate::model::{Attributes, Model};
use crate::query::{ParsedQuery, Predicate, ID_KEY};
use axum::http::Method;
use futures::future::try_join_all;
use serde_json::Value;

/// What the request asks for, independent of route shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// GET
    Read,
    /// POST: create on an empty predicate, partial update otherwise.
    CreateOrUpdate,
    /// PUT: create on an empty predicate, full replacement otherwise.
    ReplaceOrCreate,
    /// DELETE
    Delete,
}

impl Action {
    pub fn from_method(method: &Method) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.method() == method.as_str())
    }

    pub fn method(&self) -> &'static str {
        match self {
            Action::Read => "GET",
            Action::CreateOrUpdate => "POST",
            Action::ReplaceOrCreate => "PUT",
            Action::Delete => "DELETE",
        }
    }

    pub const ALL: [Action; 4] = [Action::Read, Action::CreateOrUpdate, Action::ReplaceOrCreate, Action::Delete];
}

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    One(Value),
    Many(Vec<Value>),
}

/// Result of one dispatched operation, before it becomes a response.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Found(Payload),
    Created(Payload),
    NotFound,
    Deleted,
}

/// Decided once per write request: an empty predicate creates, anything else targets matches.
/// An empty filter sent by mistake therefore creates data instead of touching every row.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteIntent {
    Create,
    Targeted(Predicate),
}

impl WriteIntent {
    pub fn decide(predicate: Predicate) -> Self {
        if predicate.is_empty() {
            WriteIntent::Create
        } else {
            WriteIntent::Targeted(predicate)
        }
    }
}

fn object_body(body: Option<Value>) -> Result<Attributes, AppError> {
    match body {
        Some(Value::Object(m)) => Ok(m),
        Some(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
        None => Err(AppError::BadRequest("request body required".into())),
    }
}

/// An array of objects, or a single object taken as a one-element collection.
fn collection_body(body: Option<Value>) -> Result<Vec<Attributes>, AppError> {
    match body {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|v| match v {
                Value::Object(m) => Ok(m),
                _ => Err(AppError::BadRequest("every body element must be a JSON object".into())),
            })
            .collect(),
        Some(Value::Object(m)) => Ok(vec![m]),
        Some(_) => Err(AppError::BadRequest("body must be a JSON array or object".into())),
        None => Err(AppError::BadRequest("request body required".into())),
    }
}

/// `body` as the full attribute set of `existing`, keeping the existing id.
fn replacement(existing: &Value, body: &Attributes) -> Result<Attributes, ModelError> {
    let id = existing
        .get(ID_KEY)
        .cloned()
        .ok_or_else(|| ModelError::internal("matched entity has no id"))?;
    let mut entity = body.clone();
    entity.insert(ID_KEY.to_string(), id);
    Ok(entity)
}

fn without_id(mut body: Attributes) -> Attributes {
    body.remove(ID_KEY);
    body
}

pub struct CrudDispatcher;

impl CrudDispatcher {
    /// Route one request to its operation.
    pub async fn dispatch(
        model: &dyn Model,
        shape: Shape,
        action: Action,
        query: ParsedQuery,
        body: Option<Value>,
    ) -> Result<Outcome, AppError> {
        let predicate = serde_json::Value::Object(query.predicate.clone());
        tracing::debug!(
            model = %model.name(),
            shape = shape.as_str(),
            ?action,
            predicate = %predicate,
            "dispatch"
        );
        match (shape, action) {
            (Shape::Singular, Action::Read) => Ok(Self::find_one(model, &query).await?),
            (Shape::Singular, Action::CreateOrUpdate) => Self::create_or_update_one(model, query, body).await,
            (Shape::Singular, Action::ReplaceOrCreate) => Self::replace_or_create_one(model, query, body).await,
            (Shape::Singular, Action::Delete) => Ok(Self::destroy_one(model, &query).await?),
            (Shape::Plural, Action::Read) => Ok(Self::find_all(model, &query).await?),
            (Shape::Plural, Action::CreateOrUpdate) => Self::create_or_update_all(model, query, body).await,
            (Shape::Plural, Action::ReplaceOrCreate) => Self::replace_or_create_all(model, query, body).await,
            (Shape::Plural, Action::Delete) => Ok(Self::destroy_all(model, &query).await?),
        }
    }

    pub async fn find_one(model: &dyn Model, query: &ParsedQuery) -> Result<Outcome, ModelError> {
        Ok(match model.find(&query.predicate, &query.options).await? {
            Some(entity) => Outcome::Found(Payload::One(entity)),
            None => Outcome::NotFound,
        })
    }

    pub async fn create_or_update_one(
        model: &dyn Model,
        query: ParsedQuery,
        body: Option<Value>,
    ) -> Result<Outcome, AppError> {
        let body = object_body(body)?;
        Ok(match WriteIntent::decide(query.predicate) {
            WriteIntent::Create => Outcome::Created(Payload::One(model.spawn(body).await?)),
            WriteIntent::Targeted(predicate) => match model.update(&predicate, &without_id(body)).await? {
                Some(entity) => Outcome::Found(Payload::One(entity)),
                None => Outcome::NotFound,
            },
        })
    }

    pub async fn replace_or_create_one(
        model: &dyn Model,
        query: ParsedQuery,
        body: Option<Value>,
    ) -> Result<Outcome, AppError> {
        let body = object_body(body)?;
        let predicate = match WriteIntent::decide(query.predicate) {
            WriteIntent::Create => return Ok(Outcome::Created(Payload::One(model.spawn(body).await?))),
            WriteIntent::Targeted(predicate) => predicate,
        };
        let Some(existing) = model.find(&predicate, &query.options).await? else {
            return Ok(Outcome::NotFound);
        };
        let entity = replacement(&existing, &without_id(body))?;
        Ok(Outcome::Found(Payload::One(model.persist(entity).await?)))
    }

    /// Deletes the first match, if any. Never reports absence.
    pub async fn destroy_one(model: &dyn Model, query: &ParsedQuery) -> Result<Outcome, ModelError> {
        let removed = model.delete(&query.predicate).await?;
        tracing::debug!(model = %model.name(), found = removed.is_some(), "destroy one");
        Ok(Outcome::Deleted)
    }

    pub async fn find_all(model: &dyn Model, query: &ParsedQuery) -> Result<Outcome, ModelError> {
        let rows = model.find_many(&query.predicate, &query.options).await?;
        Ok(Outcome::Found(Payload::Many(rows)))
    }

    pub async fn create_or_update_all(
        model: &dyn Model,
        query: ParsedQuery,
        body: Option<Value>,
    ) -> Result<Outcome, AppError> {
        Ok(match WriteIntent::decide(query.predicate) {
            WriteIntent::Create => {
                let items = collection_body(body)?;
                Outcome::Created(Payload::Many(model.spawn_many(items).await?))
            }
            WriteIntent::Targeted(predicate) => {
                let patch = without_id(object_body(body)?);
                Outcome::Found(Payload::Many(model.update_many(&predicate, &patch).await?))
            }
        })
    }

    /// Replacement of each match runs concurrently; the whole set is awaited before returning.
    pub async fn replace_or_create_all(
        model: &dyn Model,
        query: ParsedQuery,
        body: Option<Value>,
    ) -> Result<Outcome, AppError> {
        let predicate = match WriteIntent::decide(query.predicate) {
            WriteIntent::Create => {
                let items = collection_body(body)?;
                return Ok(Outcome::Created(Payload::Many(model.spawn_many(items).await?)));
            }
            WriteIntent::Targeted(predicate) => predicate,
        };
        let body = without_id(object_body(body)?);
        let matches = model.find_many(&predicate, &query.options).await?;
        let entities = matches
            .iter()
            .map(|existing| replacement(existing, &body))
            .collect::<Result<Vec<_>, _>>()?;
        let persisted = try_join_all(entities.into_iter().map(|e| model.persist(e))).await?;
        Ok(Outcome::Found(Payload::Many(persisted)))
    }

    pub async fn destroy_all(model: &dyn Model, query: &ParsedQuery) -> Result<Outcome, ModelError> {
        let removed = model.delete_many(&query.predicate).await?;
        tracing::debug!(model = %model.name(), removed = removed.len(), "destroy all");
        Ok(Outcome::Deleted)
    }
}
