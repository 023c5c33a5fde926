//! Field projection: `name age` keeps fields, `-secret` drops them. `_id` is kept unless `-_id`.

use crate::query::QueryError;
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    Include { paths: Vec<String>, with_id: bool },
    Exclude(Vec<String>),
}

impl Projection {
    pub fn parse(s: &str) -> Result<Option<Self>, QueryError> {
        let tokens: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Ok(None);
        }
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for t in tokens {
            match t.strip_prefix('-') {
                Some(p) => exclude.push(p.to_string()),
                None => include.push(t.trim_start_matches('+').to_string()),
            }
        }
        if include.is_empty() {
            return Ok(Some(Projection::Exclude(exclude)));
        }
        // `-_id` is the only exclusion allowed next to inclusions.
        if exclude.iter().any(|p| p != "_id") {
            return Err(QueryError::InvalidProjection(
                "cannot mix inclusion and exclusion".into(),
            ));
        }
        Ok(Some(Projection::Include {
            paths: include,
            with_id: exclude.is_empty(),
        }))
    }

    pub fn apply(&self, doc: &mut Value) {
        let Value::Object(obj) = doc else { return };
        match self {
            Projection::Exclude(paths) => {
                for p in paths {
                    remove_path(obj, p);
                }
            }
            Projection::Include { paths, with_id } => {
                let mut out = Map::new();
                if *with_id {
                    if let Some(id) = obj.get("_id") {
                        out.insert("_id".into(), id.clone());
                    }
                }
                for p in paths {
                    copy_path(obj, &mut out, p);
                }
                *obj = out;
            }
        }
    }
}

fn remove_path(obj: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            obj.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(inner)) = obj.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

fn copy_path(src: &Map<String, Value>, dst: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(v) = src.get(path) {
                dst.insert(path.to_string(), v.clone());
            }
        }
        Some((head, rest)) => {
            if let Some(Value::Object(inner)) = src.get(head) {
                let entry = dst
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(target) = entry {
                    copy_path(inner, target, rest);
                }
            }
        }
    }
}
