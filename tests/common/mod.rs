//! Shared test doubles: in-memory collection, failing collection/cache,
//! and response helpers.

use async_trait::async_trait;
use axum::{body::Body, http::Response};
use febby::collection::project_fields;
use febby::{Cache, CacheError, Collection, DeleteReport, StoreError, UpdateReport};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;

pub struct MemoryCollection {
    name: String,
    docs: RwLock<BTreeMap<String, Value>>,
}

impl MemoryCollection {
    pub fn new(name: &str) -> Self {
        MemoryCollection {
            name: name.to_string(),
            docs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Seed with documents; each must carry an `_id` string.
    pub fn with_docs(name: &str, docs: Vec<Value>) -> Self {
        let map = docs
            .into_iter()
            .map(|d| {
                let id = d["_id"].as_str().expect("seed doc needs _id").to_string();
                (id, d)
            })
            .collect();
        MemoryCollection {
            name: name.to_string(),
            docs: RwLock::new(map),
        }
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.docs.read().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.read().unwrap().len()
    }
}

fn matches(doc: &Value, filter: &Value) -> bool {
    match filter {
        Value::Object(map) => map
            .iter()
            .all(|(k, v)| doc.get(k).map(|d| d == v).unwrap_or(false)),
        _ => false,
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_by_id(
        &self,
        id: &str,
        projection: Option<&str>,
    ) -> Result<Option<Value>, StoreError> {
        Ok(self.get(id).map(|d| project_fields(d, projection)))
    }

    async fn find(
        &self,
        filter: &Value,
        projection: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .docs
            .read()
            .unwrap()
            .values()
            .filter(|d| matches(d, filter))
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|d| project_fields(d.clone(), projection))
            .collect())
    }

    async fn find_ids(&self, filter: &Value) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .docs
            .read()
            .unwrap()
            .iter()
            .filter(|(_, d)| matches(d, filter))
            .map(|(id, _)| Value::String(id.clone()))
            .collect())
    }

    async fn insert_one(&self, doc: Value) -> Result<Value, StoreError> {
        let mut obj = match doc {
            Value::Object(m) => m,
            _ => return Err(StoreError::Backend("not an object".into())),
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
        self.docs.write().unwrap().insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_one(&self, id: &str, changes: &Value) -> Result<UpdateReport, StoreError> {
        let mut docs = self.docs.write().unwrap();
        match docs.get_mut(id) {
            Some(Value::Object(doc)) => {
                if let Value::Object(changes) = changes {
                    for (k, v) in changes {
                        if k != "_id" {
                            doc.insert(k.clone(), v.clone());
                        }
                    }
                }
                Ok(UpdateReport {
                    matched_count: 1,
                    modified_count: 1,
                })
            }
            _ => Ok(UpdateReport {
                matched_count: 0,
                modified_count: 0,
            }),
        }
    }

    async fn delete_one(&self, id: &str) -> Result<DeleteReport, StoreError> {
        let removed = self.docs.write().unwrap().remove(id).is_some();
        Ok(DeleteReport {
            deleted_count: removed as u64,
        })
    }
}

/// Every operation fails with "boom".
pub struct FailingCollection;

#[async_trait]
impl Collection for FailingCollection {
    fn name(&self) -> &str {
        "pets"
    }

    async fn find_by_id(&self, _: &str, _: Option<&str>) -> Result<Option<Value>, StoreError> {
        Err(StoreError::Backend("boom".into()))
    }

    async fn find(
        &self,
        _: &Value,
        _: Option<&str>,
        _: i64,
        _: i64,
    ) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Backend("boom".into()))
    }

    async fn find_ids(&self, _: &Value) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Backend("boom".into()))
    }

    async fn insert_one(&self, _: Value) -> Result<Value, StoreError> {
        Err(StoreError::Backend("boom".into()))
    }

    async fn update_one(&self, _: &str, _: &Value) -> Result<UpdateReport, StoreError> {
        Err(StoreError::Backend("boom".into()))
    }

    async fn delete_one(&self, _: &str) -> Result<DeleteReport, StoreError> {
        Err(StoreError::Backend("boom".into()))
    }
}

/// Cache whose writes always fail; reads always miss.
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _: &str, _: String, _: Duration) -> Result<(), CacheError> {
        Err(CacheError("cache down".into()))
    }

    async fn del(&self, _: &str) -> Result<(), CacheError> {
        Err(CacheError("cache down".into()))
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}
