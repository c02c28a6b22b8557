//! CRUD handlers: list, get-by-id, create, update, delete.
//!
//! Each handler closes over a [`CrudContext`] holding its collection handle,
//! so one facade can serve any number of collections without shared
//! per-request state. Only the primary collection operation can fail a
//! request; cache trouble is logged and ignored.

use crate::cache::{cache_key, Cache};
use crate::collection::{project_fields, Collection};
use crate::error::ApiError;
use crate::response;
use crate::routes::{handler_fn, Handler};
use axum::{
    extract::{Path, Query, Request},
    response::{IntoResponse, Response},
    Json, RequestExt,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SKIP: i64 = 0;
pub const DEFAULT_LIMIT: i64 = 10;

/// Everything a generated CRUD handler needs: the collection it serves, the
/// optional side cache, and the service name that prefixes cache keys.
#[derive(Clone)]
pub struct CrudContext {
    pub collection: Arc<dyn Collection>,
    pub cache: Option<Arc<dyn Cache>>,
    pub service_name: String,
    pub cache_ttl: Duration,
}

impl CrudContext {
    fn key(&self, id: &str) -> String {
        cache_key(&self.service_name, self.collection.name(), id)
    }

    /// Detached cache write; failure is observed only by the log sink.
    fn spawn_cache_write(&self, id: &str, doc: &Value) {
        if let Some(cache) = self.cache.clone() {
            let key = self.key(id);
            let raw = doc.to_string();
            let ttl = self.cache_ttl;
            tokio::spawn(async move {
                if let Err(err) = cache.set(&key, raw, ttl).await {
                    tracing::warn!(key = %key, error = %err, "cache write failed");
                }
            });
        }
    }

    async fn invalidate(&self, id: &str) {
        if let Some(cache) = &self.cache {
            let key = self.key(id);
            if let Err(err) = cache.del(&key).await {
                tracing::warn!(key = %key, error = %err, "cache invalidation failed");
            }
        }
    }
}

/// Translate a `+`-joined projection into a space-separated field list.
/// Only the first `+` is replaced: `"a+b+c"` becomes `"a b+c"`. Known quirk
/// of the original wire contract, kept for compatibility.
pub fn build_projection(raw: &str) -> String {
    raw.replacen('+', " ", 1)
}

#[derive(Deserialize, Default)]
struct ReadParams {
    projection: Option<String>,
}

#[derive(Deserialize, Default)]
struct ListParams {
    skip: Option<i64>,
    limit: Option<i64>,
    projection: Option<String>,
    query: Option<String>,
}

async fn get_by_id(ctx: CrudContext, mut req: Request) -> Result<Response, ApiError> {
    let Path(id) = req
        .extract_parts::<Path<String>>()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let Query(params) = req
        .extract_parts::<Query<ReadParams>>()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let projection = params.projection.as_deref().map(build_projection);

    if let Some(cache) = &ctx.cache {
        let key = ctx.key(&id);
        match cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                // Hit: serve the projected cache entry without touching the collection.
                Ok(doc) => {
                    return Ok(response::ok(project_fields(doc, projection.as_deref()))
                        .into_response())
                }
                Err(err) => tracing::warn!(key = %key, error = %err, "cache entry is not json"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(key = %key, error = %err, "cache read failed"),
        }
    }

    let doc = ctx.collection.find_by_id(&id, projection.as_deref()).await?;
    if let Some(doc) = doc.as_ref() {
        ctx.spawn_cache_write(&id, doc);
    }
    Ok(response::ok(doc).into_response())
}

async fn list(ctx: CrudContext, mut req: Request) -> Result<Response, ApiError> {
    let Query(params) = req
        .extract_parts::<Query<ListParams>>()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let skip = params.skip.unwrap_or(DEFAULT_SKIP);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let filter: Value = match params.query.as_deref() {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| ApiError::internal(format!("invalid query filter: {}", e)))?,
        None => Value::Object(Default::default()),
    };
    let projection = params.projection.as_deref().map(build_projection);

    // Count fetch and data fetch hit independent reads; run them together.
    let (ids, docs) = tokio::join!(
        ctx.collection.find_ids(&filter),
        ctx.collection
            .find(&filter, projection.as_deref(), skip, limit)
    );
    let count = ids?.len() as u64;
    Ok(response::list_body(docs?, count).into_response())
}

async fn create(ctx: CrudContext, req: Request) -> Result<Response, ApiError> {
    let Json(body) = req
        .extract::<Json<Value>, _>()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let doc = ctx.collection.insert_one(body).await?;
    if let Some(id) = doc.get("_id").and_then(Value::as_str) {
        ctx.spawn_cache_write(id, &doc);
    }
    Ok(response::created(doc).into_response())
}

async fn update(ctx: CrudContext, mut req: Request) -> Result<Response, ApiError> {
    let Path(id) = req
        .extract_parts::<Path<String>>()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let Json(changes) = req
        .extract::<Json<Value>, _>()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    // Best-effort invalidation before and after the write.
    ctx.invalidate(&id).await;
    let report = ctx.collection.update_one(&id, &changes).await?;
    ctx.invalidate(&id).await;
    Ok(response::ok(report).into_response())
}

async fn delete(ctx: CrudContext, mut req: Request) -> Result<Response, ApiError> {
    let Path(id) = req
        .extract_parts::<Path<String>>()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    ctx.invalidate(&id).await;
    let report = ctx.collection.delete_one(&id).await?;
    Ok(response::ok(report).into_response())
}

pub fn list_handler(ctx: CrudContext) -> Handler {
    handler_fn(move |req| list(ctx.clone(), req))
}

pub fn get_by_id_handler(ctx: CrudContext) -> Handler {
    handler_fn(move |req| get_by_id(ctx.clone(), req))
}

pub fn create_handler(ctx: CrudContext) -> Handler {
    handler_fn(move |req| create(ctx.clone(), req))
}

pub fn update_handler(ctx: CrudContext) -> Handler {
    handler_fn(move |req| update(ctx.clone(), req))
}

pub fn delete_handler(ctx: CrudContext) -> Handler {
    handler_fn(move |req| delete(ctx.clone(), req))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_replaces_only_first_plus() {
        assert_eq!(build_projection("a+b+c"), "a b+c");
        // Not idempotent: a second pass eats the next '+'.
        assert_eq!(build_projection(&build_projection("a+b+c")), "a b c");
    }

    #[test]
    fn projection_without_plus_is_unchanged() {
        assert_eq!(build_projection("name"), "name");
    }
}
