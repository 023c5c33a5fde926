//! Query-string translation: ordered `(key, value)` pairs become a `DocumentQuery`.
//!
//! Keys are applied in the order the request supplied them. Filters merge with AND,
//! sort keys accumulate, and `skip`/`limit`/`select` keep the last value seen.
//! Unrecognized keys are ignored.

pub mod filter;
pub mod projection;
pub mod sort;

pub use filter::{Condition, Filter};
pub use projection::Projection;
pub use sort::{SortKey, SortSpec};

use crate::error::AppError;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("invalid sort: {0}")]
    InvalidSort(String),
    #[error("invalid projection: {0}")]
    InvalidProjection(String),
    #[error("invalid {key}: '{value}' is not a non-negative integer")]
    InvalidNumber { key: &'static str, value: String },
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

/// Canonical query operation for a query-string key, synonyms folded in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryKey {
    Find,
    Sort,
    Skip,
    Limit,
    Populate,
    Select,
}

impl QueryKey {
    pub fn from_param(key: &str) -> Option<Self> {
        Some(match key {
            "find" | "where" | "q" => QueryKey::Find,
            "sort" => QueryKey::Sort,
            "skip" => QueryKey::Skip,
            "limit" | "lim" => QueryKey::Limit,
            "populate" | "pop" => QueryKey::Populate,
            "select" | "fields" => QueryKey::Select,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentQuery {
    pub filter: Filter,
    pub sort: SortSpec,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub populate: Vec<String>,
    pub projection: Option<Projection>,
}

impl DocumentQuery {
    pub fn from_params(params: &[(String, String)]) -> Result<Self, QueryError> {
        let mut q = DocumentQuery::default();
        for (key, value) in params {
            let Some(op) = QueryKey::from_param(key) else {
                continue;
            };
            match op {
                QueryKey::Find => {
                    let f = Filter::parse_str(value)?;
                    q.filter = std::mem::take(&mut q.filter).and(f);
                }
                QueryKey::Sort => q.sort.extend(SortSpec::parse(value)?),
                QueryKey::Skip => q.skip = Some(parse_count("skip", value)?),
                QueryKey::Limit => q.limit = Some(parse_count("limit", value)?),
                QueryKey::Populate => q.populate.extend(split_paths(value)),
                QueryKey::Select => q.projection = Projection::parse(value)?,
            }
        }
        Ok(q)
    }

    /// Add the soft-delete exclusion unless the caller already filters on the flag.
    pub fn exclude_destroyed(mut self, field: Option<&str>) -> Self {
        if let Some(field) = field {
            if !self.filter.names_field(field) {
                let clause = Filter::field(field, Condition::Ne(Value::Bool(true)));
                self.filter = std::mem::take(&mut self.filter).and(clause);
            }
        }
        self
    }

    /// The count action keeps only the filter.
    pub fn for_count(self) -> Self {
        DocumentQuery {
            filter: self.filter,
            ..DocumentQuery::default()
        }
    }
}

fn parse_count(key: &'static str, value: &str) -> Result<u64, QueryError> {
    value.trim().parse().map_err(|_| QueryError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}

fn split_paths(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn folds_synonyms_and_ignores_unknown_keys() {
        let q = DocumentQuery::from_params(&pairs(&[
            ("q", r#"{"name":"a"}"#),
            ("lim", "2"),
            ("pop", "owner parts"),
            ("utm_source", "mail"),
        ]))
        .unwrap();
        assert_eq!(q.filter, Filter::field("name", Condition::Eq(json!("a"))).and(Filter::default()));
        assert_eq!(q.limit, Some(2));
        assert_eq!(q.populate, vec!["owner".to_string(), "parts".to_string()]);
    }

    #[test]
    fn later_scalar_values_win_and_filters_merge() {
        let q = DocumentQuery::from_params(&pairs(&[
            ("limit", "5"),
            ("where", r#"{"a":1}"#),
            ("limit", "3"),
            ("find", r#"{"b":2}"#),
        ]))
        .unwrap();
        assert_eq!(q.limit, Some(3));
        assert!(q.filter.matches(&json!({"a": 1, "b": 2})));
        assert!(!q.filter.matches(&json!({"a": 1})));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(DocumentQuery::from_params(&pairs(&[("skip", "-1")])).is_err());
        assert!(DocumentQuery::from_params(&pairs(&[("where", "nope")])).is_err());
    }

    #[test]
    fn soft_delete_is_added_unless_caller_names_the_flag() {
        let q = DocumentQuery::default().exclude_destroyed(Some("_destroy"));
        assert!(!q.filter.matches(&json!({"_destroy": true})));
        assert!(q.filter.matches(&json!({})));

        let q = DocumentQuery::from_params(&pairs(&[("where", r#"{"_destroy":true}"#)]))
            .unwrap()
            .exclude_destroyed(Some("_destroy"));
        assert!(q.filter.matches(&json!({"_destroy": true})));

        let q = DocumentQuery::default().exclude_destroyed(None);
        assert!(q.filter.is_empty());
    }

    #[test]
    fn count_keeps_only_the_filter() {
        let q = DocumentQuery::from_params(&pairs(&[("limit", "1"), ("sort", "-a"), ("where", "{}")]))
            .unwrap()
            .for_count();
        assert_eq!(q.limit, None);
        assert!(q.sort.is_empty());
    }
}
