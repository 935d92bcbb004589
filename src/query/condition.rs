//! Predicate interpretation shared by the model adapters: a typed condition tree
//! built from the decoded predicate, evaluable in memory or compilable to SQL.

use super::Predicate;
use crate::error::ModelError;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Like,
    Exists,
}

impl Comparison {
    fn from_operator(op: &str) -> Option<Self> {
        Some(match op {
            "$eq" => Comparison::Eq,
            "$ne" | "$neq" => Comparison::Ne,
            "$gt" => Comparison::Gt,
            "$gte" => Comparison::Gte,
            "$lt" => Comparison::Lt,
            "$lte" => Comparison::Lte,
            "$in" => Comparison::In,
            "$nin" => Comparison::Nin,
            "$like" => Comparison::Like,
            "$exists" => Comparison::Exists,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
    Field {
        path: Vec<String>,
        op: Comparison,
        value: Value,
    },
}

impl Condition {
    /// Build the condition tree. Unknown operators and mistyped operands are validation errors.
    pub fn from_predicate(predicate: &Predicate) -> Result<Condition, ModelError> {
        let mut parts = Vec::with_capacity(predicate.len());
        for (key, value) in predicate {
            match key.as_str() {
                "$and" => parts.push(Condition::All(sub_predicates(key, value)?)),
                "$or" => parts.push(Condition::Any(sub_predicates(key, value)?)),
                "$not" => match value {
                    Value::Object(obj) => parts.push(Condition::Not(Box::new(Self::from_predicate(obj)?))),
                    _ => return Err(ModelError::validation("$not expects an object")),
                },
                k if k.starts_with('$') => {
                    return Err(ModelError::validation(format!("unsupported operator: {}", k)))
                }
                field => parts.extend(field_conditions(field, value)?),
            }
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::All(parts)
        })
    }

    pub fn matches(&self, entity: &Value) -> bool {
        match self {
            Condition::All(parts) => parts.iter().all(|c| c.matches(entity)),
            Condition::Any(parts) => parts.iter().any(|c| c.matches(entity)),
            Condition::Not(inner) => !inner.matches(entity),
            Condition::Field { path, op, value } => field_matches(lookup(entity, path), *op, value),
        }
    }
}

fn sub_predicates(op: &str, value: &Value) -> Result<Vec<Condition>, ModelError> {
    let items = value
        .as_array()
        .ok_or_else(|| ModelError::validation(format!("{} expects an array of objects", op)))?;
    items
        .iter()
        .map(|item| match item {
            Value::Object(obj) => Condition::from_predicate(obj),
            _ => Err(ModelError::validation(format!("{} expects an array of objects", op))),
        })
        .collect()
}

fn field_conditions(field: &str, value: &Value) -> Result<Vec<Condition>, ModelError> {
    let path: Vec<String> = field.split('.').map(str::to_string).collect();
    let operators = match value {
        Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => obj,
        _ => {
            return Ok(vec![Condition::Field {
                path,
                op: Comparison::Eq,
                value: value.clone(),
            }])
        }
    };
    let mut out = Vec::with_capacity(operators.len());
    for (op_name, operand) in operators {
        let op = Comparison::from_operator(op_name)
            .ok_or_else(|| ModelError::validation(format!("unsupported operator: {}", op_name)))?;
        check_operand(field, op_name, op, operand)?;
        out.push(Condition::Field {
            path: path.clone(),
            op,
            value: operand.clone(),
        });
    }
    Ok(out)
}

fn check_operand(field: &str, op_name: &str, op: Comparison, operand: &Value) -> Result<(), ModelError> {
    let ok = match op {
        Comparison::In | Comparison::Nin => operand.is_array(),
        Comparison::Like => operand.is_string(),
        Comparison::Exists => operand.is_boolean(),
        Comparison::Gt | Comparison::Gte | Comparison::Lt | Comparison::Lte => {
            operand.is_number() || operand.is_string()
        }
        Comparison::Eq | Comparison::Ne => true,
    };
    if ok {
        Ok(())
    } else {
        Err(ModelError::validation(format!("invalid operand for {} on {}", op_name, field)))
    }
}

/// Resolve a dot path inside an entity. `None` when any segment is missing.
pub(crate) fn lookup<'a>(entity: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(entity, |current, segment| current.get(segment.as_str()))
}

fn field_matches(actual: Option<&Value>, op: Comparison, operand: &Value) -> bool {
    let order = || actual.and_then(|a| ordered(a, operand));
    match op {
        Comparison::Exists => actual.is_some() == operand.as_bool().unwrap_or(true),
        Comparison::Ne => actual.map_or(true, |a| !json_eq(a, operand)),
        Comparison::Nin => actual.map_or(true, |a| !in_array(a, operand)),
        Comparison::Eq => actual.map_or(false, |a| json_eq(a, operand)),
        Comparison::In => actual.map_or(false, |a| in_array(a, operand)),
        Comparison::Gt => order() == Some(Ordering::Greater),
        Comparison::Gte => matches!(order(), Some(Ordering::Greater | Ordering::Equal)),
        Comparison::Lt => order() == Some(Ordering::Less),
        Comparison::Lte => matches!(order(), Some(Ordering::Less | Ordering::Equal)),
        Comparison::Like => match (actual.and_then(Value::as_str), operand.as_str()) {
            (Some(s), Some(pattern)) => like_regex(pattern).map_or(false, |re| re.is_match(s)),
            _ => false,
        },
    }
}

fn in_array(actual: &Value, operand: &Value) -> bool {
    operand
        .as_array()
        .map_or(false, |items| items.iter().any(|item| json_eq(actual, item)))
}

/// Equality with numbers compared by value, so `1` matches `1.0`.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

/// Numbers with numbers, strings with strings; mixed types have no order.
fn ordered(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64()?.partial_cmp(&m.as_f64()?),
        (Value::String(s), Value::String(t)) => Some(s.cmp(t)),
        _ => None,
    }
}

/// SQL `LIKE` pattern (`%`, `_`) as an anchored regex.
fn like_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push_str("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

/// Total order used for sorting: missing/null, booleans, numbers, strings, arrays, objects.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x @ Value::Number(_)), Some(y @ Value::Number(_)))
        | (Some(x @ Value::String(_)), Some(y @ Value::String(_))) => {
            ordered(x, y).unwrap_or(Ordering::Equal)
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(v: Value) -> Result<Condition, ModelError> {
        match v {
            Value::Object(obj) => Condition::from_predicate(&obj),
            _ => panic!("predicate must be an object"),
        }
    }

    #[test]
    fn empty_predicate_matches_everything() {
        let c = cond(json!({})).unwrap();
        assert!(c.matches(&json!({"id": 1})));
    }

    #[test]
    fn literal_values_are_equality() {
        let c = cond(json!({"name": "a", "age": 5})).unwrap();
        assert!(c.matches(&json!({"name": "a", "age": 5.0})));
        assert!(!c.matches(&json!({"name": "a", "age": 6})));
        assert!(!c.matches(&json!({"name": "a"})));
    }

    #[test]
    fn operators_and_nested_paths() {
        let c = cond(json!({"age": {"$gte": 18, "$lt": 65}, "owner.name": {"$like": "A%"}})).unwrap();
        assert!(c.matches(&json!({"age": 30, "owner": {"name": "Ann"}})));
        assert!(!c.matches(&json!({"age": 70, "owner": {"name": "Ann"}})));
        assert!(!c.matches(&json!({"age": 30, "owner": {"name": "Bob"}})));
    }

    #[test]
    fn missing_fields_satisfy_only_negative_operators() {
        let entity = json!({"id": 1});
        assert!(cond(json!({"x": {"$ne": 1}})).unwrap().matches(&entity));
        assert!(cond(json!({"x": {"$nin": [1]}})).unwrap().matches(&entity));
        assert!(cond(json!({"x": {"$exists": false}})).unwrap().matches(&entity));
        assert!(!cond(json!({"x": {"$gt": 0}})).unwrap().matches(&entity));
        assert!(!cond(json!({"x": {"$in": [1]}})).unwrap().matches(&entity));
    }

    #[test]
    fn boolean_combinators() {
        let c = cond(json!({"$or": [{"a": 1}, {"b": {"$in": [2, 3]}}], "$not": {"c": true}})).unwrap();
        assert!(c.matches(&json!({"a": 1})));
        assert!(c.matches(&json!({"b": 3, "c": false})));
        assert!(!c.matches(&json!({"b": 3, "c": true})));
        assert!(!c.matches(&json!({"b": 4})));
    }

    #[test]
    fn mixed_type_ordering_never_matches() {
        let c = cond(json!({"age": {"$gt": "10"}})).unwrap();
        assert!(!c.matches(&json!({"age": 50})));
    }

    #[test]
    fn unsupported_operators_and_operands_are_validation_errors() {
        use crate::error::ModelErrorKind;
        assert_eq!(cond(json!({"a": {"$near": 1}})).unwrap_err().kind, ModelErrorKind::Validation);
        assert_eq!(cond(json!({"a": {"$in": 1}})).unwrap_err().kind, ModelErrorKind::Validation);
        assert_eq!(cond(json!({"$xor": []})).unwrap_err().kind, ModelErrorKind::Validation);
        assert_eq!(cond(json!({"$or": [1]})).unwrap_err().kind, ModelErrorKind::Validation);
    }

    #[test]
    fn object_without_operators_is_deep_equality() {
        let c = cond(json!({"tags": {"color": "red"}})).unwrap();
        assert!(c.matches(&json!({"tags": {"color": "red"}})));
        assert!(!c.matches(&json!({"tags": {"color": "red", "size": 1}})));
    }

    #[test]
    fn sort_order_puts_missing_first() {
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
    }
}
