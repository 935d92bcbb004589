//! Raw resource configuration as read from JSON.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFIX: &str = "/api";
pub const DEFAULT_PLURAL_SUFFIX: &str = "s";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Exposure of one registered model. Paths default from the lower-cased model name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub singular: Option<String>,
    #[serde(default)]
    pub plural: Option<String>,
}

impl ModelConfig {
    pub fn named(name: impl Into<String>) -> Self {
        ModelConfig {
            name: name.into(),
            singular: None,
            plural: None,
        }
    }

    pub fn with_paths(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Self {
        self.singular = Some(singular.into());
        self.plural = Some(plural.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Mount path for every generated route and the discovery document.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_plural_suffix")]
    pub plural_suffix: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
    /// `None` exposes every registered model in name order.
    #[serde(default)]
    pub models: Option<Vec<ModelConfig>>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.into()
}

fn default_plural_suffix() -> String {
    DEFAULT_PLURAL_SUFFIX.into()
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

impl Default for ResourceConfig {
    fn default() -> Self {
        ResourceConfig {
            prefix: default_prefix(),
            plural_suffix: default_plural_suffix(),
            body_limit: default_body_limit(),
            models: None,
        }
    }
}

impl ResourceConfig {
    pub fn with_models(mut self, models: Vec<ModelConfig>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Override prefix and plural suffix from `MODEL_REST_PREFIX` / `MODEL_REST_PLURAL_SUFFIX`.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(prefix) = std::env::var("MODEL_REST_PREFIX") {
            self.prefix = prefix;
        }
        if let Ok(suffix) = std::env::var("MODEL_REST_PLURAL_SUFFIX") {
            self.plural_suffix = suffix;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: ResourceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ResourceConfig::default());
        assert_eq!(cfg.prefix, "/api");
        assert!(cfg.models.is_none());
    }

    #[test]
    fn model_entries_accept_partial_overrides() {
        let cfg: ResourceConfig = serde_json::from_str(
            r#"{"prefix": "", "models": [{"name": "User"}, {"name": "Person", "plural": "people"}]}"#,
        )
        .unwrap();
        let models = cfg.models.unwrap();
        assert_eq!(models[0], ModelConfig::named("User"));
        assert_eq!(models[1].plural.as_deref(), Some("people"));
        assert_eq!(models[1].singular, None);
    }
}
