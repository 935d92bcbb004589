//! Model layer contract consumed by the dispatcher, plus the registry of named models.
//! Entities are JSON objects carrying an `id`.

mod memory;
mod postgres;
mod validation;

pub use memory::MemoryModel;
pub use postgres::PgModel;
pub use validation::{RequestValidator, ValidationRule};

use crate::error::ModelError;
use crate::query::{Predicate, QueryOptions};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Attribute set of one entity, without or with its `id`.
pub type Attributes = Map<String, Value>;

#[async_trait]
pub trait Model: Send + Sync {
    fn name(&self) -> &str;

    /// First entity matching the predicate after sort/skip are applied.
    async fn find(&self, predicate: &Predicate, options: &QueryOptions) -> Result<Option<Value>, ModelError>;

    async fn find_many(&self, predicate: &Predicate, options: &QueryOptions) -> Result<Vec<Value>, ModelError>;

    /// Merge `patch` into the first match; attributes not in `patch` are left untouched.
    async fn update(&self, predicate: &Predicate, patch: &Attributes) -> Result<Option<Value>, ModelError>;

    async fn update_many(&self, predicate: &Predicate, patch: &Attributes) -> Result<Vec<Value>, ModelError>;

    /// Delete the first match, returning it.
    async fn delete(&self, predicate: &Predicate) -> Result<Option<Value>, ModelError>;

    async fn delete_many(&self, predicate: &Predicate) -> Result<Vec<Value>, ModelError>;

    async fn spawn(&self, attributes: Attributes) -> Result<Value, ModelError>;

    async fn spawn_many(&self, items: Vec<Attributes>) -> Result<Vec<Value>, ModelError>;

    /// Replace the stored entity with the same `id` wholesale.
    async fn persist(&self, entity: Attributes) -> Result<Value, ModelError>;
}

/// Named models available for exposure. Built once before configuration.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<dyn Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the model's own name, replacing any model already registered with it.
    pub fn register(&mut self, model: Arc<dyn Model>) -> &mut Self {
        self.models.insert(model.name().to_string(), model);
        self
    }

    pub fn with(mut self, model: impl Model + 'static) -> Self {
        self.register(Arc::new(model));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Model>> {
        self.models.get(name).cloned()
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.models.keys()).finish()
    }
}
