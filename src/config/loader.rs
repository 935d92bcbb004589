//! Load resource config from a JSON file and resolve it against the model registry.

use crate::config::resolved::{ModelBinding, ResolvedResources};
use crate::config::types::{ModelConfig, ResourceConfig};
use crate::config::{normalize_prefix, validate_bindings};
use crate::error::ConfigError;
use crate::model::ModelRegistry;
use std::collections::HashSet;
use std::path::Path;

/// Read a `ResourceConfig` from a JSON file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<ResourceConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Build the binding table. Fails on unknown or repeated models and on bad or colliding paths.
pub fn configure(config: &ResourceConfig, registry: &ModelRegistry) -> Result<ResolvedResources, ConfigError> {
    let prefix = normalize_prefix(&config.prefix)?;
    let entries: Vec<ModelConfig> = match &config.models {
        Some(models) => models.clone(),
        None => registry.names().map(ModelConfig::named).collect(),
    };

    let mut seen = HashSet::new();
    let mut bindings = Vec::with_capacity(entries.len());
    for entry in &entries {
        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::DuplicateModel(entry.name.clone()));
        }
        let model = registry.get(&entry.name).ok_or_else(|| ConfigError::MissingReference {
            kind: "model",
            id: entry.name.clone(),
        })?;
        let lower = entry.name.to_lowercase();
        let singular_path = entry.singular.clone().unwrap_or_else(|| lower.clone());
        let plural_path = entry
            .plural
            .clone()
            .unwrap_or_else(|| format!("{}{}", lower, config.plural_suffix));
        bindings.push(ModelBinding {
            model_name: entry.name.clone(),
            singular_path,
            plural_path,
            model,
        });
    }

    validate_bindings(
        &prefix,
        bindings
            .iter()
            .map(|b| (b.model_name.as_str(), b.singular_path.as_str(), b.plural_path.as_str())),
    )?;

    for b in &bindings {
        tracing::info!(
            model = %b.model_name,
            singular = %format!("{}/{}", prefix, b.singular_path),
            plural = %format!("{}/{}", prefix, b.plural_path),
            "resource bound"
        );
    }
    Ok(ResolvedResources::new(prefix, config.body_limit, bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Shape;
    use crate::model::MemoryModel;

    fn registry() -> ModelRegistry {
        ModelRegistry::new().with(MemoryModel::new("User")).with(MemoryModel::new("Pet"))
    }

    #[test]
    fn defaults_expose_every_model_in_name_order() {
        let resolved = configure(&ResourceConfig::default(), &registry()).unwrap();
        let names: Vec<_> = resolved.bindings.iter().map(|b| b.model_name.as_str()).collect();
        assert_eq!(names, vec!["Pet", "User"]);
        assert_eq!(resolved.prefix, "/api");
        let (b, shape) = resolved.lookup("users").unwrap();
        assert_eq!((b.model_name.as_str(), shape), ("User", Shape::Plural));
        let (b, shape) = resolved.lookup("pet").unwrap();
        assert_eq!((b.model_name.as_str(), shape), ("Pet", Shape::Singular));
    }

    #[test]
    fn overrides_and_suffix_apply() {
        let mut cfg = ResourceConfig::default().with_models(vec![
            ModelConfig::named("User").with_paths("person", "people"),
            ModelConfig::named("Pet"),
        ]);
        cfg.plural_suffix = "z".into();
        let resolved = configure(&cfg, &registry()).unwrap();
        assert!(resolved.lookup("people").is_some());
        assert!(resolved.lookup("petz").is_some());
        assert!(resolved.lookup("users").is_none());
    }

    #[test]
    fn unknown_model_is_fatal() {
        let cfg = ResourceConfig::default().with_models(vec![ModelConfig::named("Ghost")]);
        let err = configure(&cfg, &registry()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReference { kind: "model", ref id } if id == "Ghost"));
    }

    #[test]
    fn repeated_model_is_fatal() {
        let cfg = ResourceConfig::default().with_models(vec![ModelConfig::named("User"), ModelConfig::named("User")]);
        assert!(matches!(configure(&cfg, &registry()), Err(ConfigError::DuplicateModel(_))));
    }

    #[test]
    fn override_colliding_with_a_default_is_fatal() {
        let cfg = ResourceConfig::default().with_models(vec![
            ModelConfig::named("User"),
            ModelConfig::named("Pet").with_paths("pet", "users"),
        ]);
        assert!(matches!(configure(&cfg, &registry()), Err(ConfigError::DuplicatePathSegment(_))));
    }

    #[test]
    fn model_shadowing_a_common_route_is_fatal_without_prefix() {
        let registry = registry().with(MemoryModel::new("Version"));
        let cfg = ResourceConfig::default().with_prefix("");
        assert!(matches!(configure(&cfg, &registry), Err(ConfigError::ReservedPathSegment(_))));
        assert!(configure(&ResourceConfig::default(), &registry).is_ok());
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let err = load_from_path("/definitely/not/here.json").await.unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
