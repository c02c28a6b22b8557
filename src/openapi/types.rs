//! Typed subset of an OpenAPI document: only what route binding consumes.
//! Everything else in the document is ignored.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Deserialize, Debug)]
pub struct OpenApiDocument {
    #[serde(default)]
    pub servers: Vec<ServerObject>,
    #[serde(default)]
    pub paths: Option<BTreeMap<String, PathItem>>,
}

#[derive(Deserialize, Debug)]
pub struct ServerObject {
    pub url: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub patch: Option<Operation>,
    pub head: Option<Operation>,
    pub options: Option<Operation>,
}

impl PathItem {
    /// Present operations in a fixed method order.
    pub fn operations(&self) -> Vec<(&'static str, &Operation)> {
        [
            ("get", &self.get),
            ("put", &self.put),
            ("post", &self.post),
            ("delete", &self.delete),
            ("patch", &self.patch),
            ("head", &self.head),
            ("options", &self.options),
        ]
        .into_iter()
        .filter_map(|(m, op)| op.as_ref().map(|o| (m, o)))
        .collect()
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Operation {
    /// Vendor extension naming the controller to dispatch to. Required.
    #[serde(rename = "x-controller")]
    pub controller: Option<String>,
    /// Vendor extension listing middleware names, applied in order.
    #[serde(default, rename = "x-middlewares")]
    pub middlewares: Vec<String>,
    #[serde(default, rename = "operationId")]
    pub operation_id: Option<String>,
    #[serde(default, rename = "requestBody")]
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: BTreeMap<String, ResponseObject>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RequestBody {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Deserialize, Debug, Default)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<Value>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ResponseObject {
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

impl Operation {
    /// JSON request-body schema, when one is declared.
    pub fn request_schema(&self) -> Option<&Value> {
        self.request_body
            .as_ref()?
            .content
            .get("application/json")?
            .schema
            .as_ref()
    }

    /// JSON schema of the first declared 2xx response, when present.
    pub fn success_response_schema(&self) -> Option<&Value> {
        self.responses
            .iter()
            .find(|(status, _)| status.starts_with('2'))
            .and_then(|(_, resp)| resp.content.get("application/json"))
            .and_then(|media| media.schema.as_ref())
    }
}
