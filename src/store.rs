//! Postgres-backed document collections. One JSONB table per collection,
//! all living in a schema named from `FEBBY_SCHEMA` env (default `febby`).

use crate::collection::{project_fields, Collection, DeleteReport, StoreError, UpdateReport};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

/// Schema name for collection tables. Must be a valid PostgreSQL identifier.
pub fn febby_schema() -> String {
    std::env::var("FEBBY_SCHEMA").unwrap_or_else(|_| "febby".into())
}

/// Collection and schema names are interpolated into DDL/DML, so only plain
/// identifiers pass.
fn valid_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn qualified_table(name: &str) -> Result<String, StoreError> {
    if !valid_ident(name) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    let schema = febby_schema();
    if !valid_ident(&schema) {
        return Err(StoreError::InvalidName(schema));
    }
    Ok(format!("{}.{}", schema, name))
}

/// Create the schema and the collection's table if missing.
pub async fn ensure_collection(pool: &PgPool, name: &str) -> Result<(), StoreError> {
    let table = qualified_table(name)?;
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", febby_schema()))
        .execute(pool)
        .await?;
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            doc JSONB NOT NULL
        )
        "#,
        table
    );
    sqlx::query(&ddl).execute(pool).await?;
    Ok(())
}

/// A named JSONB document table implementing [`Collection`].
pub struct PgCollection {
    pool: PgPool,
    name: String,
    table: String,
}

impl PgCollection {
    pub fn new(pool: PgPool, name: &str) -> Result<Self, StoreError> {
        let table = qualified_table(name)?;
        Ok(PgCollection {
            pool,
            name: name.to_string(),
            table,
        })
    }
}

fn object_filter(filter: &Value) -> Result<Value, StoreError> {
    match filter {
        Value::Object(_) => Ok(filter.clone()),
        other => Err(StoreError::InvalidFilter(format!(
            "filter must be a JSON object, got {}",
            other
        ))),
    }
}

#[async_trait]
impl Collection for PgCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_by_id(
        &self,
        id: &str,
        projection: Option<&str>,
    ) -> Result<Option<Value>, StoreError> {
        let sql = format!("SELECT doc FROM {} WHERE id = $1", self.table);
        tracing::debug!(sql = %sql, id = %id, "query");
        let doc: Option<Value> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(|d| project_fields(d, projection)))
    }

    async fn find(
        &self,
        filter: &Value,
        projection: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Value>, StoreError> {
        let filter = object_filter(filter)?;
        let sql = format!(
            "SELECT doc FROM {} WHERE doc @> $1 ORDER BY id OFFSET $2 LIMIT $3",
            self.table
        );
        tracing::debug!(sql = %sql, filter = %filter, skip, limit, "query");
        let docs: Vec<Value> = sqlx::query_scalar(&sql)
            .bind(filter)
            .bind(skip.max(0))
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await?;
        Ok(docs
            .into_iter()
            .map(|d| project_fields(d, projection))
            .collect())
    }

    async fn find_ids(&self, filter: &Value) -> Result<Vec<Value>, StoreError> {
        let filter = object_filter(filter)?;
        let sql = format!("SELECT id FROM {} WHERE doc @> $1 ORDER BY id", self.table);
        tracing::debug!(sql = %sql, filter = %filter, "query");
        let ids: Vec<String> = sqlx::query_scalar(&sql)
            .bind(filter)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(Value::String).collect())
    }

    async fn insert_one(&self, doc: Value) -> Result<Value, StoreError> {
        let mut obj = match doc {
            Value::Object(m) => m,
            other => {
                return Err(StoreError::InvalidDocument(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };
        let id = match obj.get("_id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                obj.insert("_id".into(), Value::String(id.clone()));
                id
            }
        };
        let stored = Value::Object(obj);
        let sql = format!("INSERT INTO {} (id, doc) VALUES ($1, $2)", self.table);
        tracing::debug!(sql = %sql, id = %id, "query");
        sqlx::query(&sql)
            .bind(&id)
            .bind(&stored)
            .execute(&self.pool)
            .await?;
        Ok(stored)
    }

    async fn update_one(&self, id: &str, changes: &Value) -> Result<UpdateReport, StoreError> {
        let mut changes = match changes {
            Value::Object(m) => m.clone(),
            other => {
                return Err(StoreError::InvalidDocument(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };
        // The document keeps its identity regardless of the payload.
        changes.remove("_id");
        let sql = format!("UPDATE {} SET doc = doc || $2 WHERE id = $1", self.table);
        tracing::debug!(sql = %sql, id = %id, "query");
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(changes))
            .execute(&self.pool)
            .await?;
        let n = result.rows_affected();
        Ok(UpdateReport {
            matched_count: n,
            modified_count: n,
        })
    }

    async fn delete_one(&self, id: &str) -> Result<DeleteReport, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        tracing::debug!(sql = %sql, id = %id, "query");
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(DeleteReport {
            deleted_count: result.rows_affected(),
        })
    }
}
