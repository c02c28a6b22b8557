//! Schema validation middleware built from the bound document.
//!
//! Validators compile once at bind time; a schema that fails to compile is a
//! configuration error, not a per-request one. Request violations surface as
//! 400 with the validator's messages, response violations as 500.

use crate::error::ConfigError;
use crate::response::error_body;
use crate::routes::{middleware_fn, Middleware};
use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonschema::Validator;
use serde_json::Value;
use std::sync::Arc;

/// Replace every in-document `$ref` with the referenced schema so the
/// compiled validator is self-contained. Cyclic references are rejected.
pub fn inline_refs(schema: &Value, root: &Value) -> Result<Value, ConfigError> {
    let mut stack = Vec::new();
    inline(schema, root, &mut stack)
}

fn inline(schema: &Value, root: &Value, stack: &mut Vec<String>) -> Result<Value, ConfigError> {
    match schema {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if stack.iter().any(|r| r == reference) {
                    return Err(ConfigError::OpenApi(format!(
                        "cyclic $ref: {}",
                        reference
                    )));
                }
                let target = resolve_pointer(root, reference)?;
                stack.push(reference.clone());
                let inlined = inline(&target, root, stack)?;
                stack.pop();
                return Ok(inlined);
            }
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), inline(v, root, stack)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|v| inline(v, root, stack))
                .collect::<Result<_, _>>()?,
        )),
        other => Ok(other.clone()),
    }
}

fn resolve_pointer(root: &Value, reference: &str) -> Result<Value, ConfigError> {
    let pointer = reference.strip_prefix('#').ok_or_else(|| {
        ConfigError::OpenApi(format!(
            "unsupported external $ref '{}'; only in-document refs are resolvable",
            reference
        ))
    })?;
    root.pointer(pointer)
        .cloned()
        .ok_or_else(|| ConfigError::OpenApi(format!("unresolved $ref: {}", reference)))
}

/// Compile `schema` (with refs inlined from `root`) into a shared validator.
pub fn compile_schema(schema: &Value, root: &Value) -> Result<Arc<Validator>, ConfigError> {
    let inlined = inline_refs(schema, root)?;
    let validator = jsonschema::validator_for(&inlined)
        .map_err(|e| ConfigError::OpenApi(format!("schema does not compile: {}", e)))?;
    Ok(Arc::new(validator))
}

fn violation_messages(validator: &Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|e| e.to_string())
        .collect()
}

/// Middleware validating the JSON request body before the chain continues.
pub fn request_validation(validator: Arc<Validator>, body_required: bool) -> Middleware {
    middleware_fn(move |req: Request, next: Next| {
        let validator = validator.clone();
        async move {
            let (parts, body) = req.into_parts();
            let bytes = match axum::body::to_bytes(body, usize::MAX).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(error_body(&format!("unreadable body: {}", err), 400)),
                    )
                        .into_response()
                }
            };
            if bytes.is_empty() {
                if body_required {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(error_body("request body is required", 400)),
                    )
                        .into_response();
                }
                return next
                    .run(Request::from_parts(parts, Body::from(bytes)))
                    .await;
            }
            let instance: Value = match serde_json::from_slice(&bytes) {
                Ok(v) => v,
                Err(err) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(error_body(&format!("body is not valid json: {}", err), 400)),
                    )
                        .into_response()
                }
            };
            let violations = violation_messages(&validator, &instance);
            if !violations.is_empty() {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(error_body(&violations.join("; "), 400)),
                )
                    .into_response();
            }
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
    })
}

/// Middleware validating successful JSON responses against the declared 2xx
/// schema. A mismatch is the server's fault: 500.
pub fn response_validation(validator: Arc<Validator>) -> Middleware {
    middleware_fn(move |req: Request, next: Next| {
        let validator = validator.clone();
        async move {
            let response = next.run(req).await;
            if !response.status().is_success() || !is_json(&response) {
                return response;
            }
            let (parts, body) = response.into_parts();
            let bytes = match axum::body::to_bytes(body, usize::MAX).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(error_body(&format!("unreadable response body: {}", err), 500)),
                    )
                        .into_response()
                }
            };
            if let Ok(instance) = serde_json::from_slice::<Value>(&bytes) {
                let violations = violation_messages(&validator, &instance);
                if !violations.is_empty() {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(error_body(
                            &format!("response does not match schema: {}", violations.join("; ")),
                            500,
                        )),
                    )
                        .into_response();
                }
            }
            Response::from_parts(parts, Body::from(bytes))
        }
    })
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inlines_component_refs() {
        let root = json!({
            "components": { "schemas": { "Pet": { "type": "object" } } }
        });
        let schema = json!({ "$ref": "#/components/schemas/Pet" });
        assert_eq!(inline_refs(&schema, &root).unwrap(), json!({"type": "object"}));
    }

    #[test]
    fn unresolved_ref_is_an_error() {
        let root = json!({});
        let schema = json!({ "$ref": "#/components/schemas/Missing" });
        assert!(matches!(
            inline_refs(&schema, &root),
            Err(ConfigError::OpenApi(_))
        ));
    }

    #[test]
    fn cyclic_ref_is_an_error() {
        let root = json!({
            "components": { "schemas": { "A": { "$ref": "#/components/schemas/A" } } }
        });
        let schema = json!({ "$ref": "#/components/schemas/A" });
        assert!(matches!(
            inline_refs(&schema, &root),
            Err(ConfigError::OpenApi(_))
        ));
    }
}
