//! Builds parameterized SQL over JSONB collection tables.
//! Each collection is a table `(id TEXT PRIMARY KEY, seq BIGSERIAL, doc JSONB)`; `seq` keeps insertion order.
//! Identifiers come from validated config only; every request-supplied value is a parameter.

use crate::query::{Condition, DocumentQuery, Filter, SortSpec};
use crate::sql::SqlParam;
use serde_json::Value;

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: SqlParam) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }
}

pub fn create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema))
}

pub fn create_collection(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, seq BIGSERIAL, doc JSONB NOT NULL)",
        table
    )
}

/// SELECT doc with filter, ORDER BY sort keys then seq, optional LIMIT/OFFSET. `limit = 0` means no limit.
pub fn select_documents(table: &str, query: &DocumentQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(&mut q, &query.filter);
    let order_clause = order_clause(&mut q, &query.sort);
    let limit_clause = match query.limit {
        Some(n) if n > 0 => format!(" LIMIT {}", n),
        _ => String::new(),
    };
    let offset_clause = query.skip.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT doc FROM {}{}{}{}{}",
        table, where_clause, order_clause, limit_clause, offset_clause
    );
    q
}

pub fn select_one(table: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(&mut q, filter);
    q.sql = format!("SELECT doc FROM {}{} ORDER BY seq LIMIT 1", table, where_clause);
    q
}

pub fn select_by_ids(table: &str, ids: &[String]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(SqlParam::TextArray(ids.to_vec()));
    q.sql = format!("SELECT doc FROM {} WHERE id = ANY(${}::text[]) ORDER BY seq", table, n);
    q
}

pub fn count_documents(table: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(&mut q, filter);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", table, where_clause);
    q
}

pub fn insert_document(table: &str, id: &str, doc: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_param = q.push_param(SqlParam::Text(id.to_string()));
    let doc_param = q.push_param(SqlParam::Json(doc));
    q.sql = format!(
        "INSERT INTO {} (id, doc) VALUES (${}, ${}::jsonb) RETURNING doc",
        table, id_param, doc_param
    );
    q
}

pub fn replace_document(table: &str, id: &str, doc: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let doc_param = q.push_param(SqlParam::Json(doc));
    let id_param = q.push_param(SqlParam::Text(id.to_string()));
    q.sql = format!(
        "UPDATE {} SET doc = ${}::jsonb WHERE id = ${} RETURNING doc",
        table, doc_param, id_param
    );
    q
}

pub fn delete_document(table: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(SqlParam::Text(id.to_string()));
    q.sql = format!("DELETE FROM {} WHERE id = ${} RETURNING doc", table, n);
    q
}

fn where_clause(q: &mut QueryBuf, filter: &Filter) -> String {
    if filter.is_empty() {
        return String::new();
    }
    format!(" WHERE {}", render_filter(q, filter))
}

fn order_clause(q: &mut QueryBuf, sort: &SortSpec) -> String {
    let mut parts = Vec::with_capacity(sort.keys.len() + 1);
    for key in &sort.keys {
        let field = path_expr(q, &key.path);
        parts.push(if key.descending {
            format!("{} DESC NULLS LAST", field)
        } else {
            format!("{} ASC NULLS FIRST", field)
        });
    }
    parts.push("seq".to_string());
    format!(" ORDER BY {}", parts.join(", "))
}

fn path_expr(q: &mut QueryBuf, path: &str) -> String {
    let segments = path.split('.').map(str::to_string).collect();
    let n = q.push_param(SqlParam::TextArray(segments));
    format!("(doc #> ${}::text[])", n)
}

fn render_filter(q: &mut QueryBuf, filter: &Filter) -> String {
    match filter {
        Filter::And(parts) if parts.is_empty() => "TRUE".into(),
        Filter::Or(parts) if parts.is_empty() => "FALSE".into(),
        Filter::Field {
            condition: Condition::In(list),
            ..
        } if list.is_empty() => "FALSE".into(),
        Filter::Field {
            condition: Condition::Nin(list),
            ..
        } if list.is_empty() => "TRUE".into(),
        Filter::And(parts) => join(q, parts, " AND "),
        Filter::Or(parts) => join(q, parts, " OR "),
        Filter::Field { path, condition } => {
            let field = path_expr(q, path);
            render_condition(q, &field, condition)
        }
    }
}

fn join(q: &mut QueryBuf, parts: &[Filter], sep: &str) -> String {
    let rendered: Vec<String> = parts.iter().map(|p| render_filter(q, p)).collect();
    format!("({})", rendered.join(sep))
}

fn render_condition(q: &mut QueryBuf, field: &str, condition: &Condition) -> String {
    match condition {
        Condition::Eq(v) => eq_expr(q, field, v),
        Condition::Ne(v) => format!("NOT {}", eq_expr(q, field, v)),
        Condition::Gt(v) => cmp_expr(q, field, ">", v),
        Condition::Gte(v) => cmp_expr(q, field, ">=", v),
        Condition::Lt(v) => cmp_expr(q, field, "<", v),
        Condition::Lte(v) => cmp_expr(q, field, "<=", v),
        Condition::In(list) => any_eq(q, field, list),
        Condition::Nin(list) => format!("NOT {}", any_eq(q, field, list)),
        Condition::Exists(true) => format!("{} IS NOT NULL", field),
        Condition::Exists(false) => format!("{} IS NULL", field),
    }
}

/// Never NULL, so `NOT` is safe. A missing field equals `null`; arrays match on any element.
fn eq_expr(q: &mut QueryBuf, field: &str, v: &Value) -> String {
    if v.is_null() {
        return format!("({f} IS NULL OR {f} = 'null'::jsonb)", f = field);
    }
    let n = q.push_param(SqlParam::Json(v.clone()));
    format!(
        "COALESCE({f} = ${n}::jsonb OR (jsonb_typeof({f}) = 'array' AND {f} @> jsonb_build_array(${n}::jsonb)), FALSE)",
        f = field,
        n = n
    )
}

fn any_eq(q: &mut QueryBuf, field: &str, list: &[Value]) -> String {
    if list.is_empty() {
        return "FALSE".into();
    }
    let parts: Vec<String> = list.iter().map(|v| eq_expr(q, field, v)).collect();
    format!("({})", parts.join(" OR "))
}

/// Ordering comparisons only between scalars of the same JSON type.
fn cmp_expr(q: &mut QueryBuf, field: &str, op: &str, v: &Value) -> String {
    let n = q.push_param(SqlParam::Json(v.clone()));
    let rhs = format!("${}::jsonb", n);
    format!(
        "COALESCE(jsonb_typeof({rhs}) IN ('number', 'string', 'boolean') AND CASE WHEN jsonb_typeof({f}) = 'array' \
         THEN EXISTS (SELECT 1 FROM jsonb_array_elements({f}) AS e(val) WHERE jsonb_typeof(e.val) = jsonb_typeof({rhs}) AND e.val {op} {rhs}) \
         ELSE jsonb_typeof({f}) = jsonb_typeof({rhs}) AND {f} {op} {rhs} END, FALSE)",
        f = field,
        rhs = rhs,
        op = op
    )
}
