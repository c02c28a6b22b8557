//! Collection seam: the document-store operations CRUD handlers depend on.
//! One facade serves many collections because each handler closes over its
//! own `Arc<dyn Collection>` instead of reading a shared request property.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("invalid collection name: '{0}'")]
    InvalidName(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("{0}")]
    Backend(String),
}

/// Raw result of an update operation. Returned to the client as-is; the
/// updated document is not re-fetched.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Raw result of a delete operation.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted_count: u64,
}

/// A named collection of JSON documents. Documents are objects carrying an
/// `_id` string; `projection` is a space-separated field list (see
/// `handlers::crud::build_projection`).
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    async fn find_by_id(&self, id: &str, projection: Option<&str>) -> Result<Option<Value>, StoreError>;

    /// Page of matching documents, ordered by id.
    async fn find(
        &self,
        filter: &Value,
        projection: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Value>, StoreError>;

    /// Ids of all matching documents; its length is the list count.
    async fn find_ids(&self, filter: &Value) -> Result<Vec<Value>, StoreError>;

    /// Insert one document, generating `_id` when absent. Returns the stored document.
    async fn insert_one(&self, doc: Value) -> Result<Value, StoreError>;

    /// Shallow-merge `changes` into the document with the given id.
    async fn update_one(&self, id: &str, changes: &Value) -> Result<UpdateReport, StoreError>;

    async fn delete_one(&self, id: &str) -> Result<DeleteReport, StoreError>;
}

/// Keep only projected fields of a document. `_id` always survives; a
/// non-object document is returned unchanged.
pub fn project_fields(doc: Value, projection: Option<&str>) -> Value {
    let fields: Vec<&str> = match projection {
        Some(p) if !p.trim().is_empty() => p.split_whitespace().collect(),
        _ => return doc,
    };
    match doc {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| k == "_id" || fields.contains(&k.as_str()))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projection_keeps_listed_fields_and_id() {
        let doc = json!({"_id": "x", "a": 1, "b": 2});
        assert_eq!(project_fields(doc, Some("a")), json!({"_id": "x", "a": 1}));
    }

    #[test]
    fn empty_projection_is_identity() {
        let doc = json!({"a": 1, "b": 2});
        assert_eq!(project_fields(doc.clone(), None), doc);
        assert_eq!(project_fields(doc.clone(), Some("  ")), doc);
    }
}
