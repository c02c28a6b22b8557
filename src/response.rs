//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

/// List envelope: `{"value": [...], "count": N}` where count is the length
/// of the matching-id fetch, not of the returned page.
#[derive(Serialize)]
pub struct ListBody {
    pub value: Vec<Value>,
    pub count: u64,
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

pub fn list_body(value: Vec<Value>, count: u64) -> (StatusCode, Json<ListBody>) {
    (StatusCode::OK, Json(ListBody { value, count }))
}

/// Plain error envelope as a raw value, for sites that build responses by hand.
pub fn error_body(message: &str, code: u16) -> Value {
    serde_json::json!({ "error": message, "code": code })
}
