//! Resolved binding table: config validated and flattened for runtime use. Built once, read-only.

use crate::model::Model;
use std::collections::HashMap;
use std::sync::Arc;

/// Which of a model's two endpoints a path segment addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Singular,
    Plural,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Singular => "singular",
            Shape::Plural => "plural",
        }
    }
}

#[derive(Clone)]
pub struct ModelBinding {
    pub model_name: String,
    pub singular_path: String,
    pub plural_path: String,
    pub model: Arc<dyn Model>,
}

impl std::fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBinding")
            .field("model_name", &self.model_name)
            .field("singular_path", &self.singular_path)
            .field("plural_path", &self.plural_path)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedResources {
    /// Empty, or starts with `/` and has no trailing slash.
    pub prefix: String,
    pub body_limit: usize,
    /// In configuration order.
    pub bindings: Vec<ModelBinding>,
    by_path: HashMap<String, (usize, Shape)>,
}

impl ResolvedResources {
    /// Caller guarantees segments are unique (see `validate_bindings`).
    pub(crate) fn new(prefix: String, body_limit: usize, bindings: Vec<ModelBinding>) -> Self {
        let mut by_path = HashMap::with_capacity(bindings.len() * 2);
        for (i, b) in bindings.iter().enumerate() {
            by_path.insert(b.singular_path.clone(), (i, Shape::Singular));
            by_path.insert(b.plural_path.clone(), (i, Shape::Plural));
        }
        ResolvedResources {
            prefix,
            body_limit,
            bindings,
            by_path,
        }
    }

    pub fn lookup(&self, segment: &str) -> Option<(&ModelBinding, Shape)> {
        let &(i, shape) = self.by_path.get(segment)?;
        Some((&self.bindings[i], shape))
    }
}
