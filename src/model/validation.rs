//! Per-attribute validation rules enforced by the in-memory model.

use super::Attributes;
use crate::error::ModelError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

impl ValidationRule {
    pub fn required() -> Self {
        ValidationRule {
            required: Some(true),
            ..Default::default()
        }
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a complete attribute set. All required attributes must be present and non-null.
    pub fn validate(attributes: &Attributes, rules: &HashMap<String, ValidationRule>) -> Result<(), ModelError> {
        for (field, rule) in rules {
            let val = attributes.get(field);
            if rule.required == Some(true) && (val.is_none() || val == Some(&Value::Null)) {
                return Err(ModelError::validation(format!("{} is required", field)));
            }
            if let Some(v) = val {
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the attributes present (partial update). Required is not enforced for absent ones,
    /// but a required attribute cannot be set to null.
    pub fn validate_partial(attributes: &Attributes, rules: &HashMap<String, ValidationRule>) -> Result<(), ModelError> {
        for (field, v) in attributes {
            if let Some(rule) = rules.get(field) {
                if rule.required == Some(true) && v.is_null() {
                    return Err(ModelError::validation(format!("{} is required", field)));
                }
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }
}

fn validate_field(field: &str, v: &Value, rule: &ValidationRule) -> Result<(), ModelError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(field, v, format)?;
    }
    if let (Some(max), Some(s)) = (rule.max_length, v.as_str()) {
        if s.chars().count() > max as usize {
            return Err(ModelError::validation(format!("{} must be at most {} characters", field, max)));
        }
    }
    if let (Some(min), Some(s)) = (rule.min_length, v.as_str()) {
        if s.chars().count() < min as usize {
            return Err(ModelError::validation(format!("{} must be at least {} characters", field, min)));
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| ModelError::internal(format!("invalid pattern for {}", field)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(ModelError::validation(format!("{} does not match required pattern", field)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(ModelError::validation(format!(
                "{} must be one of: {:?}",
                field,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let (Some(min), Some(n)) = (rule.minimum, v.as_f64()) {
        if n < min {
            return Err(ModelError::validation(format!("{} must be at least {}", field, min)));
        }
    }
    if let (Some(max), Some(n)) = (rule.maximum, v.as_f64()) {
        if n > max {
            return Err(ModelError::validation(format!("{} must be at most {}", field, max)));
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(field: &str, v: &Value, format: &str) -> Result<(), ModelError> {
    let Some(s) = v.as_str() else { return Ok(()) };
    let ok = match format.to_lowercase().as_str() {
        "email" => s.contains('@') && s.len() >= 3,
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(ModelError::validation(format!("{} must be a valid {}", field, format)))
    }
}
