//! PostgreSQL document store: one JSONB table per model collection.

use crate::config::ModelDef;
use crate::error::StoreError;
use crate::query::{DocumentQuery, Filter};
use crate::sql::{
    bind_params, count_documents, create_collection, create_schema, delete_document, insert_document,
    qualified_table, quoted, replace_document, select_by_ids, select_documents, select_one, QueryBuf,
};
use crate::store::{document_id, DocumentStore, ID_FIELD};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, Row};
use std::str::FromStr;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone, Debug)]
pub struct PgDocumentStore {
    pool: PgPool,
    schema: String,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgDocumentStore {
            pool,
            schema: schema.into(),
        }
    }

    /// Create the database if missing, then open a pool.
    pub async fn connect(uri: &str, schema: &str, max_connections: u32) -> Result<Self, StoreError> {
        ensure_database_exists(uri).await?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(uri)
            .await?;
        tracing::info!(schema, "connected to document store");
        Ok(Self::new(pool, schema))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn table(&self, model: &ModelDef) -> String {
        qualified_table(&self.schema, &model.collection)
    }

    async fn fetch_docs(&self, q: &QueryBuf) -> Result<Vec<Value>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_params(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(doc_column).collect()
    }

    async fn fetch_doc(&self, q: &QueryBuf) -> Result<Option<Value>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_params(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        row.as_ref().map(doc_column).transpose()
    }
}

fn doc_column(row: &PgRow) -> Result<Value, StoreError> {
    Ok(row.try_get::<Value, _>("doc")?)
}

fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Duplicate(db.message().to_string());
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ensure_collection(&self, model: &ModelDef) -> Result<(), StoreError> {
        sqlx::query(&create_schema(&self.schema)).execute(&self.pool).await?;
        let ddl = create_collection(&self.table(model));
        tracing::debug!(sql = %ddl, "ensure collection");
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn find(&self, model: &ModelDef, query: &DocumentQuery) -> Result<Vec<Value>, StoreError> {
        self.fetch_docs(&select_documents(&self.table(model), query)).await
    }

    async fn find_one(&self, model: &ModelDef, filter: &Filter) -> Result<Option<Value>, StoreError> {
        self.fetch_doc(&select_one(&self.table(model), filter)).await
    }

    async fn find_by_ids(&self, model: &ModelDef, ids: &[String]) -> Result<Vec<Value>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_docs(&select_by_ids(&self.table(model), ids)).await
    }

    async fn count(&self, model: &ModelDef, filter: &Filter) -> Result<u64, StoreError> {
        let q = count_documents(&self.table(model), filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_params(sqlx::query(&q.sql), &q.params)
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get(0)?;
        Ok(n.max(0) as u64)
    }

    async fn insert(&self, model: &ModelDef, doc: Map<String, Value>) -> Result<Value, StoreError> {
        let doc = Value::Object(doc);
        let id = document_id(&doc)
            .ok_or_else(|| StoreError::Validation(format!("{} is required", ID_FIELD)))?;
        let q = insert_document(&self.table(model), &id, doc);
        self.fetch_doc(&q)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn replace(
        &self,
        model: &ModelDef,
        id: &str,
        doc: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        self.fetch_doc(&replace_document(&self.table(model), id, Value::Object(doc)))
            .await
    }

    async fn remove(&self, model: &ModelDef, id: &str) -> Result<Option<Value>, StoreError> {
        self.fetch_doc(&delete_document(&self.table(model), id)).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Connects to the server's `postgres` database and creates the target database when missing.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url);
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Split a connection URL into the admin (`postgres` database) URL and the target database name.
/// The name is empty when the URL has no path after the authority.
fn parse_db_name_from_url(url: &str) -> (String, String) {
    let authority_start = url.find("://").map(|i| i + 3).unwrap_or(0);
    let before_query = url.find('?').unwrap_or(url.len());
    let Some(slash) = url
        .get(authority_start..before_query)
        .and_then(|rest| rest.find('/'))
        .map(|i| authority_start + i)
    else {
        return (url.to_string(), String::new());
    };
    let db_name = url.get(slash + 1..before_query).unwrap_or("").trim();
    let base = url.get(..=slash).unwrap_or(url);
    (format!("{}postgres", base), db_name.to_string())
}
