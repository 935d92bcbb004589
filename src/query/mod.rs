//! Query-string translation: predicate plus recognised pagination/sort options.

mod condition;
mod parser;

pub use condition::{compare_values, Comparison, Condition};
pub(crate) use condition::lookup;
pub use parser::{parse, WHERE_KEY};

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Field-path to literal value or structured condition object.
pub type Predicate = Map<String, Value>;

/// Reserved key the singular route folds its identifier segment into.
pub const ID_KEY: &str = "id";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Ordered list of sort keys, first key most significant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortSpec(pub Vec<SortKey>);

impl SortSpec {
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as `"field dir, field dir"`, the string form accepted by the parser.
    pub fn to_order_string(&self) -> String {
        self.0
            .iter()
            .map(|k| format!("{} {}", k.field, k.direction.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `[{"field": "dir"}, ...]`: accepted by the parser for any field name.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|k| {
                    let mut entry = Map::new();
                    entry.insert(k.field.clone(), Value::from(k.direction.as_str()));
                    Value::Object(entry)
                })
                .collect(),
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOptions {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<SortSpec>,
    /// Zero-based; only meaningful together with `limit`.
    pub page: Option<u64>,
}

impl QueryOptions {
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.limit.is_none() && self.sort.is_none() && self.page.is_none()
    }

    /// Records to skip: explicit `skip`, else `page * limit`.
    pub fn offset(&self) -> u64 {
        match (self.skip, self.page, self.limit) {
            (Some(skip), _, _) => skip,
            (None, Some(page), Some(limit)) => page.saturating_mul(limit),
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedQuery {
    pub predicate: Predicate,
    pub options: QueryOptions,
}

impl ParsedQuery {
    /// Re-encode as query-string pairs. The predicate always travels under `where`.
    pub fn to_params(&self) -> HashMap<String, String> {
        let mut out = HashMap::new();
        if !self.predicate.is_empty() {
            out.insert(WHERE_KEY.to_string(), Value::Object(self.predicate.clone()).to_string());
        }
        let o = &self.options;
        if let Some(skip) = o.skip {
            out.insert("skip".to_string(), skip.to_string());
        }
        if let Some(limit) = o.limit {
            out.insert("limit".to_string(), limit.to_string());
        }
        if let Some(page) = o.page {
            out.insert("page".to_string(), page.to_string());
        }
        if let Some(sort) = &o.sort {
            out.insert("sort".to_string(), sort.to_json().to_string());
        }
        out
    }
}
