//! In-process model: insertion-ordered entities behind an async lock.

use super::{Attributes, Model, RequestValidator, ValidationRule};
use crate::error::ModelError;
use crate::query::{compare_values, lookup, Condition, Predicate, QueryOptions, ID_KEY};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Table {
    rows: Vec<Value>,
    next_id: i64,
}

impl Table {
    fn contains_id(&self, id: &Value) -> bool {
        self.rows.iter().any(|r| r.get(ID_KEY) == Some(id))
    }

    fn allocate_id(&mut self) -> Value {
        loop {
            self.next_id += 1;
            let candidate = Value::from(self.next_id);
            if !self.contains_id(&candidate) {
                return candidate;
            }
        }
    }

    fn insert(&mut self, mut attributes: Attributes) -> Result<Value, ModelError> {
        let id = match attributes.remove(ID_KEY) {
            Some(Value::Null) | None => self.allocate_id(),
            Some(id) if self.contains_id(&id) => {
                return Err(ModelError::conflict(format!("id {} already exists", id)));
            }
            Some(id) => id,
        };
        attributes.insert(ID_KEY.to_string(), id);
        let row = Value::Object(attributes);
        self.rows.push(row.clone());
        Ok(row)
    }

    fn matching(&self, cond: &Condition) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| cond.matches(row))
            .map(|(i, _)| i)
            .collect()
    }
}

pub struct MemoryModel {
    name: String,
    rules: HashMap<String, ValidationRule>,
    table: RwLock<Table>,
}

impl MemoryModel {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryModel {
            name: name.into(),
            rules: HashMap::new(),
            table: RwLock::new(Table::default()),
        }
    }

    /// Attach a validation rule for one attribute.
    pub fn with_rule(mut self, field: impl Into<String>, rule: ValidationRule) -> Self {
        self.rules.insert(field.into(), rule);
        self
    }

    fn without_id(attributes: &Attributes) -> Attributes {
        let mut out = attributes.clone();
        out.remove(ID_KEY);
        out
    }

    fn merge(row: &mut Value, patch: &Attributes) {
        if let Value::Object(obj) = row {
            for (k, v) in patch {
                if k != ID_KEY {
                    obj.insert(k.clone(), v.clone());
                }
            }
        }
    }
}

/// Matching rows ordered by the sort spec (stable, so insertion order breaks ties), then paged.
fn select(rows: &[Value], cond: &Condition, options: &QueryOptions) -> Vec<Value> {
    let mut matched: Vec<&Value> = rows.iter().filter(|row| cond.matches(row)).collect();
    if let Some(sort) = &options.sort {
        let paths: Vec<(Vec<String>, bool)> = sort
            .keys()
            .iter()
            .map(|k| {
                let path = k.field.split('.').map(str::to_string).collect();
                (path, k.direction == crate::query::SortDirection::Desc)
            })
            .collect();
        matched.sort_by(|a, b| {
            for (path, desc) in &paths {
                let ord = compare_values(lookup(a, path), lookup(b, path));
                let ord = if *desc { ord.reverse() } else { ord };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
    }
    let offset = usize::try_from(options.offset()).unwrap_or(usize::MAX);
    let limit = options
        .limit
        .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
        .unwrap_or(usize::MAX);
    matched.into_iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait]
impl Model for MemoryModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, predicate: &Predicate, options: &QueryOptions) -> Result<Option<Value>, ModelError> {
        let mut one = options.clone();
        one.limit = Some(1);
        if options.skip.is_none() {
            one.skip = Some(options.offset());
        }
        Ok(self.find_many(predicate, &one).await?.into_iter().next())
    }

    async fn find_many(&self, predicate: &Predicate, options: &QueryOptions) -> Result<Vec<Value>, ModelError> {
        let cond = Condition::from_predicate(predicate)?;
        let table = self.table.read().await;
        Ok(select(&table.rows, &cond, options))
    }

    async fn update(&self, predicate: &Predicate, patch: &Attributes) -> Result<Option<Value>, ModelError> {
        let cond = Condition::from_predicate(predicate)?;
        RequestValidator::validate_partial(&Self::without_id(patch), &self.rules)?;
        let mut table = self.table.write().await;
        let Some(&idx) = table.matching(&cond).first() else {
            return Ok(None);
        };
        let row = &mut table.rows[idx];
        Self::merge(row, patch);
        Ok(Some(row.clone()))
    }

    async fn update_many(&self, predicate: &Predicate, patch: &Attributes) -> Result<Vec<Value>, ModelError> {
        let cond = Condition::from_predicate(predicate)?;
        RequestValidator::validate_partial(&Self::without_id(patch), &self.rules)?;
        let mut table = self.table.write().await;
        let mut out = Vec::new();
        for idx in table.matching(&cond) {
            let row = &mut table.rows[idx];
            Self::merge(row, patch);
            out.push(row.clone());
        }
        Ok(out)
    }

    async fn delete(&self, predicate: &Predicate) -> Result<Option<Value>, ModelError> {
        let cond = Condition::from_predicate(predicate)?;
        let mut table = self.table.write().await;
        let Some(&idx) = table.matching(&cond).first() else {
            return Ok(None);
        };
        Ok(Some(table.rows.remove(idx)))
    }

    async fn delete_many(&self, predicate: &Predicate) -> Result<Vec<Value>, ModelError> {
        let cond = Condition::from_predicate(predicate)?;
        let mut table = self.table.write().await;
        let (removed, kept): (Vec<Value>, Vec<Value>) =
            std::mem::take(&mut table.rows).into_iter().partition(|row| cond.matches(row));
        table.rows = kept;
        Ok(removed)
    }

    async fn spawn(&self, attributes: Attributes) -> Result<Value, ModelError> {
        RequestValidator::validate(&Self::without_id(&attributes), &self.rules)?;
        let mut table = self.table.write().await;
        table.insert(attributes)
    }

    async fn spawn_many(&self, items: Vec<Attributes>) -> Result<Vec<Value>, ModelError> {
        for item in &items {
            RequestValidator::validate(&Self::without_id(item), &self.rules)?;
        }
        let mut table = self.table.write().await;
        let snapshot = (table.rows.len(), table.next_id);
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match table.insert(item) {
                Ok(row) => out.push(row),
                Err(e) => {
                    // all or nothing
                    table.rows.truncate(snapshot.0);
                    table.next_id = snapshot.1;
                    return Err(e);
                }
            }
        }
        Ok(out)
    }

    async fn persist(&self, entity: Attributes) -> Result<Value, ModelError> {
        let id = entity
            .get(ID_KEY)
            .cloned()
            .ok_or_else(|| ModelError::validation("entity to persist has no id"))?;
        RequestValidator::validate(&Self::without_id(&entity), &self.rules)?;
        let mut table = self.table.write().await;
        let row = table
            .rows
            .iter_mut()
            .find(|r| r.get(ID_KEY) == Some(&id))
            .ok_or_else(|| ModelError::not_found(format!("{} {} not found", self.name, id)))?;
        *row = Value::Object(entity);
        Ok(row.clone())
    }
}
