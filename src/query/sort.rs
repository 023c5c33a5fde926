//! Sort expressions: `-name age`, `-name,age`, or `{"name": -1, "age": 1}`.

use crate::query::filter::{compare_values, lookup};
use crate::query::QueryError;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub descending: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn parse(s: &str) -> Result<Self, QueryError> {
        let s = s.trim();
        if s.starts_with('{') {
            return Self::parse_object(s);
        }
        let keys = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| match t.strip_prefix('-') {
                Some(path) => SortKey {
                    path: path.to_string(),
                    descending: true,
                },
                None => SortKey {
                    path: t.trim_start_matches('+').to_string(),
                    descending: false,
                },
            })
            .filter(|k| !k.path.is_empty())
            .collect();
        Ok(SortSpec { keys })
    }

    fn parse_object(s: &str) -> Result<Self, QueryError> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| QueryError::InvalidSort(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| QueryError::InvalidSort("sort must be a string or object".into()))?;
        let mut keys = Vec::with_capacity(obj.len());
        for (path, dir) in obj {
            let descending = match dir {
                Value::Number(n) if n.as_i64() == Some(-1) => true,
                Value::Number(n) if n.as_i64() == Some(1) => false,
                Value::String(s) if s.eq_ignore_ascii_case("desc") || s.eq_ignore_ascii_case("descending") => true,
                Value::String(s) if s.eq_ignore_ascii_case("asc") || s.eq_ignore_ascii_case("ascending") => false,
                other => {
                    return Err(QueryError::InvalidSort(format!(
                        "invalid direction for {}: {}",
                        path, other
                    )))
                }
            };
            keys.push(SortKey {
                path: path.clone(),
                descending,
            });
        }
        Ok(SortSpec { keys })
    }

    /// Later sort parameters add keys after the earlier ones.
    pub fn extend(&mut self, other: SortSpec) {
        for key in other.keys {
            self.keys.retain(|k| k.path != key.path);
            self.keys.push(key);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for key in &self.keys {
            let va = lookup(a, &key.path).unwrap_or(&Value::Null);
            let vb = lookup(b, &key.path).unwrap_or(&Value::Null);
            let ord = compare_values(va, vb);
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}
