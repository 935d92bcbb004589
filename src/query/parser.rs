//! Decode every query-string value as JSON and partition into predicate and options.

use super::{ParsedQuery, Predicate, QueryOptions, SortDirection, SortKey, SortSpec};
use crate::error::MalformedQuery;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Key whose decoded object replaces the implicit key-based predicate.
pub const WHERE_KEY: &str = "where";

/// Parse raw query-string pairs. Fails on the first value (in key order) that does not decode.
pub fn parse(params: &HashMap<String, String>) -> Result<ParsedQuery, MalformedQuery> {
    let ordered: BTreeMap<&str, &str> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    let mut decoded: BTreeMap<&str, Value> = BTreeMap::new();
    for (key, raw) in &ordered {
        let value = serde_json::from_str::<Value>(raw).map_err(|e| malformed(key, raw, e.to_string()))?;
        decoded.insert(*key, value);
    }

    let mut options = QueryOptions::default();
    let mut predicate = Predicate::new();
    let mut explicit_where: Option<Predicate> = None;

    for (key, value) in decoded {
        let raw = ordered.get(key).copied().unwrap_or_default();
        match key {
            "skip" => options.skip = Some(non_negative(key, raw, &value)?),
            "limit" => options.limit = Some(non_negative(key, raw, &value)?),
            "page" => options.page = Some(non_negative(key, raw, &value)?),
            "sort" => options.sort = Some(sort_spec(raw, &value)?),
            WHERE_KEY => match value {
                Value::Object(obj) => explicit_where = Some(obj),
                _ => return Err(malformed(key, raw, "where must be a JSON object")),
            },
            _ => {
                predicate.insert(key.to_string(), value);
            }
        }
    }

    if let Some(obj) = explicit_where {
        if !predicate.is_empty() {
            tracing::debug!(ignored = ?predicate.keys().collect::<Vec<_>>(), "where overrides sibling keys");
        }
        predicate = obj;
    }

    Ok(ParsedQuery { predicate, options })
}

fn malformed(key: &str, value: &str, reason: impl Into<String>) -> MalformedQuery {
    MalformedQuery {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn non_negative(key: &str, raw: &str, value: &Value) -> Result<u64, MalformedQuery> {
    value
        .as_u64()
        .ok_or_else(|| malformed(key, raw, "expected a non-negative integer"))
}

fn sort_spec(raw: &str, value: &Value) -> Result<SortSpec, MalformedQuery> {
    let mut keys = Vec::new();
    match value {
        Value::String(s) => keys.extend(parse_order_string(raw, s)?),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => keys.extend(parse_order_string(raw, s)?),
                    Value::Object(obj) => keys.extend(object_keys(raw, obj)?),
                    _ => return Err(malformed("sort", raw, "sort array entries must be strings or objects")),
                }
            }
        }
        Value::Object(obj) => keys.extend(object_keys(raw, obj)?),
        _ => return Err(malformed("sort", raw, "sort must be a string, array, or object")),
    }
    Ok(SortSpec(keys))
}

/// `{"name": "desc", "age": 1}`, keys in the order written.
fn object_keys(raw: &str, obj: &Map<String, Value>) -> Result<Vec<SortKey>, MalformedQuery> {
    let mut keys = Vec::with_capacity(obj.len());
    for (field, dir) in obj {
        let direction = match dir {
            Value::String(s) => direction_from_str(s),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(SortDirection::Asc),
                Some(-1) => Some(SortDirection::Desc),
                _ => None,
            },
            _ => None,
        }
        .ok_or_else(|| malformed("sort", raw, format!("invalid direction for '{}'", field)))?;
        keys.push(SortKey {
            field: field.clone(),
            direction,
        });
    }
    Ok(keys)
}

/// `"created_at desc, name"`: comma separated, direction optional (defaults to ascending).
fn parse_order_string(raw: &str, s: &str) -> Result<Vec<SortKey>, MalformedQuery> {
    let mut out = Vec::new();
    for part in s.split(',') {
        let mut it = part.split_whitespace();
        let Some(field) = it.next() else { continue };
        let direction = match it.next() {
            None => SortDirection::Asc,
            Some(d) => direction_from_str(d)
                .ok_or_else(|| malformed("sort", raw, format!("invalid direction '{}'", d)))?,
        };
        if it.next().is_some() {
            return Err(malformed("sort", raw, format!("unexpected token in '{}'", part.trim())));
        }
        out.push(SortKey {
            field: field.to_string(),
            direction,
        });
    }
    Ok(out)
}

fn direction_from_str(s: &str) -> Option<SortDirection> {
    if s.eq_ignore_ascii_case("asc") {
        Some(SortDirection::Asc)
    } else if s.eq_ignore_ascii_case("desc") {
        Some(SortDirection::Desc)
    } else {
        None
    }
}
