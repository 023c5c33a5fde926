//! Filter documents in the Mongo style: `{"name": "a", "qty": {"$gte": 2}}`.
//! Parsed once into a `Filter` tree, then either matched in memory or rendered to SQL.

use crate::query::QueryError;
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Field { path: String, condition: Condition },
}

impl Default for Filter {
    fn default() -> Self {
        Filter::And(Vec::new())
    }
}

impl Filter {
    pub fn field(path: impl Into<String>, condition: Condition) -> Self {
        Filter::Field {
            path: path.into(),
            condition,
        }
    }

    /// Parse a filter document. The top level must be a JSON object.
    pub fn parse(value: &Value) -> Result<Self, QueryError> {
        match value {
            Value::Object(obj) => parse_object(obj),
            _ => Err(QueryError::InvalidFilter("filter must be a JSON object".into())),
        }
    }

    pub fn parse_str(s: &str) -> Result<Self, QueryError> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| QueryError::InvalidFilter(format!("invalid JSON: {}", e)))?;
        Self::parse(&value)
    }

    /// Conjunction; flattens nested `And`s so the top level stays inspectable.
    pub fn and(self, other: Filter) -> Filter {
        let mut parts = match self {
            Filter::And(v) => v,
            f => vec![f],
        };
        match other {
            Filter::And(v) => parts.extend(v),
            f => parts.push(f),
        }
        Filter::And(parts)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Filter::And(v) if v.is_empty())
    }

    /// True when a top-level clause constrains `field` directly.
    pub fn names_field(&self, field: &str) -> bool {
        match self {
            Filter::Field { path, .. } => path == field,
            Filter::And(parts) => parts.iter().any(|p| p.names_field(field)),
            Filter::Or(_) => false,
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::And(parts) => parts.iter().all(|p| p.matches(doc)),
            Filter::Or(parts) => parts.iter().any(|p| p.matches(doc)),
            Filter::Field { path, condition } => condition_matches(lookup(doc, path), condition),
        }
    }
}

fn parse_object(obj: &Map<String, Value>) -> Result<Filter, QueryError> {
    let mut clauses = Vec::new();
    for (key, value) in obj {
        match key.as_str() {
            "$and" => clauses.push(Filter::And(parse_list(key, value)?)),
            "$or" => clauses.push(Filter::Or(parse_list(key, value)?)),
            k if k.starts_with('$') => {
                return Err(QueryError::InvalidFilter(format!("unsupported operator {}", k)))
            }
            _ => {
                for condition in parse_conditions(value)? {
                    clauses.push(Filter::field(key.clone(), condition));
                }
            }
        }
    }
    Ok(if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        Filter::And(clauses)
    })
}

fn parse_list(op: &str, value: &Value) -> Result<Vec<Filter>, QueryError> {
    let arr = value
        .as_array()
        .ok_or_else(|| QueryError::InvalidFilter(format!("{} expects an array", op)))?;
    arr.iter().map(Filter::parse).collect()
}

fn is_operator_object(value: &Value) -> bool {
    match value {
        Value::Object(m) => !m.is_empty() && m.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn parse_conditions(value: &Value) -> Result<Vec<Condition>, QueryError> {
    if !is_operator_object(value) {
        return Ok(vec![Condition::Eq(value.clone())]);
    }
    let Value::Object(ops) = value else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(ops.len());
    for (op, arg) in ops {
        let c = match op.as_str() {
            "$eq" => Condition::Eq(arg.clone()),
            "$ne" => Condition::Ne(arg.clone()),
            "$gt" => Condition::Gt(arg.clone()),
            "$gte" => Condition::Gte(arg.clone()),
            "$lt" => Condition::Lt(arg.clone()),
            "$lte" => Condition::Lte(arg.clone()),
            "$in" => Condition::In(as_list(op, arg)?),
            "$nin" => Condition::Nin(as_list(op, arg)?),
            "$exists" => Condition::Exists(truthy(arg)),
            other => {
                return Err(QueryError::InvalidFilter(format!("unsupported operator {}", other)))
            }
        };
        out.push(c);
    }
    Ok(out)
}

fn as_list(op: &str, arg: &Value) -> Result<Vec<Value>, QueryError> {
    arg.as_array()
        .cloned()
        .ok_or_else(|| QueryError::InvalidFilter(format!("{} expects an array", op)))
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => true,
    }
}

/// Resolve a dotted path. Numeric segments index into arrays.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = doc;
    for seg in path.split('.') {
        cur = match cur {
            Value::Object(m) => m.get(seg)?,
            Value::Array(a) => a.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

fn condition_matches(found: Option<&Value>, condition: &Condition) -> bool {
    match condition {
        Condition::Eq(v) => eq_matches(found, v),
        Condition::Ne(v) => !eq_matches(found, v),
        Condition::Gt(v) => cmp_matches(found, v, |o| o == Ordering::Greater),
        Condition::Gte(v) => cmp_matches(found, v, |o| o != Ordering::Less),
        Condition::Lt(v) => cmp_matches(found, v, |o| o == Ordering::Less),
        Condition::Lte(v) => cmp_matches(found, v, |o| o != Ordering::Greater),
        Condition::In(list) => list.iter().any(|v| eq_matches(found, v)),
        Condition::Nin(list) => !list.iter().any(|v| eq_matches(found, v)),
        Condition::Exists(want) => found.is_some() == *want,
    }
}

/// Missing fields equal `null`; arrays match when any element does.
fn eq_matches(found: Option<&Value>, expected: &Value) -> bool {
    match found {
        None => expected.is_null(),
        Some(v) if values_eq(v, expected) => true,
        Some(Value::Array(items)) => items.iter().any(|i| values_eq(i, expected)),
        Some(_) => false,
    }
}

fn cmp_matches(found: Option<&Value>, expected: &Value, pred: impl Fn(Ordering) -> bool) -> bool {
    let check = |v: &Value| {
        type_rank(v) == type_rank(expected)
            && matches!(v, Value::Number(_) | Value::String(_) | Value::Bool(_))
            && pred(compare_values(v, expected))
    };
    match found {
        None => false,
        Some(Value::Array(items)) if !expected.is_array() => items.iter().any(check),
        Some(v) => check(v),
    }
}

fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values: by type rank first, then by value.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        _ => a.to_string().cmp(&b.to_string()),
    }
}
