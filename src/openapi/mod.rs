//! OpenAPI binding: turn a parsed document plus name→function registries
//! into mounted routes.
//!
//! Controllers come from the `x-controller` vendor extension, middlewares
//! from `x-middlewares`. Every referenced name is resolved eagerly at bind
//! time; an unresolved name aborts the bind with an error naming the missing
//! registry entry, before any route mounts.

pub mod types;
pub mod validation;

pub use types::*;

use crate::error::ConfigError;
use crate::response::error_body;
use crate::routes::{Handler, Middleware, RouteConfig, RouterBuilder};
use axum::{
    body::Body,
    extract::Request,
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Registries and validation toggles for [`bind`].
pub struct OpenApiOptions {
    pub controllers: HashMap<String, Handler>,
    pub middlewares: HashMap<String, Middleware>,
    /// Structural document check at bind time (refs resolvable, paths sane).
    pub validate_spec: bool,
    /// Validate JSON request bodies against each operation's schema.
    pub validate_requests: bool,
    /// Validate successful JSON responses against the declared 2xx schema.
    pub validate_responses: bool,
}

impl Default for OpenApiOptions {
    fn default() -> Self {
        OpenApiOptions {
            controllers: HashMap::new(),
            middlewares: HashMap::new(),
            validate_spec: true,
            validate_requests: true,
            validate_responses: false,
        }
    }
}

impl OpenApiOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controller(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.controllers.insert(name.into(), handler);
        self
    }

    pub fn middleware(mut self, name: impl Into<String>, mw: Middleware) -> Self {
        self.middlewares.insert(name.into(), mw);
        self
    }
}

struct PlannedRoute {
    method: &'static str,
    path: String,
    middlewares: Vec<Middleware>,
    handler: Handler,
}

/// Bind every path/method operation of `document` (YAML or JSON text) and
/// return the assembled router, mounted under the path component of each
/// declared server URL (root when none are declared).
pub fn bind(document: &str, options: &OpenApiOptions) -> Result<Router, ConfigError> {
    let raw: Value = parse_document(document)?;
    let doc: OpenApiDocument = serde_json::from_value(raw.clone())
        .map_err(|e| ConfigError::OpenApi(format!("malformed document: {}", e)))?;

    let paths = match doc.paths.as_ref() {
        Some(paths) if !paths.is_empty() => paths,
        _ => {
            return Err(ConfigError::OpenApi(
                "document has no paths to bind; add a non-empty 'paths' object".into(),
            ))
        }
    };

    if options.validate_spec {
        check_document(paths, &raw)?;
    }

    // Resolve everything before mounting anything.
    let param_re = Regex::new(r"\{([^}/]+)\}")
        .map_err(|e| ConfigError::OpenApi(format!("path parameter pattern: {}", e)))?;
    let mut planned = Vec::new();
    for (raw_path, item) in paths {
        let path = param_re.replace_all(raw_path, ":$1").into_owned();
        for (method, op) in item.operations() {
            let controller_name = op.controller.as_deref().ok_or_else(|| {
                ConfigError::OpenApi(format!(
                    "x-controller missing for {} {}; every operation must name \
                     a controller from OpenApiOptions::controllers",
                    method, raw_path
                ))
            })?;
            let handler = options
                .controllers
                .get(controller_name)
                .cloned()
                .ok_or_else(|| {
                    ConfigError::OpenApi(format!(
                        "no controller named '{}' supplied for {} {}; add it to \
                         OpenApiOptions::controllers",
                        controller_name, method, raw_path
                    ))
                })?;

            let mut chain: Vec<Middleware> = Vec::new();
            if options.validate_requests {
                if let Some(schema) = op.request_schema() {
                    let validator = validation::compile_schema(schema, &raw)?;
                    let required = op.request_body.as_ref().map(|b| b.required).unwrap_or(false);
                    chain.push(validation::request_validation(validator, required));
                }
            }
            if options.validate_responses {
                if let Some(schema) = op.success_response_schema() {
                    let validator = validation::compile_schema(schema, &raw)?;
                    chain.push(validation::response_validation(validator));
                }
            }
            for name in &op.middlewares {
                let mw = options.middlewares.get(name).cloned().ok_or_else(|| {
                    ConfigError::OpenApi(format!(
                        "no middleware named '{}' supplied for {} {}; add it to \
                         OpenApiOptions::middlewares",
                        name, method, raw_path
                    ))
                })?;
                chain.push(mw);
            }

            planned.push(PlannedRoute {
                method,
                path: path.clone(),
                middlewares: chain,
                handler,
            });
        }
    }

    let mut builder = RouterBuilder::new();
    for route in planned {
        let mut config = RouteConfig::new(route.method, route.path).handler(route.handler);
        config.middlewares = route.middlewares;
        builder.register(config)?;
    }

    let router = builder.finish().layer(from_fn(translate_errors));
    Ok(mount_under_servers(router, &doc.servers))
}

fn parse_document(document: &str) -> Result<Value, ConfigError> {
    let trimmed = document.trim_start();
    if trimmed.starts_with('{') {
        serde_json::from_str(document)
            .map_err(|e| ConfigError::OpenApi(format!("document is not valid json: {}", e)))
    } else {
        serde_yaml::from_str(document)
            .map_err(|e| ConfigError::OpenApi(format!("document is not valid yaml: {}", e)))
    }
}

/// Bind-time structural check: paths look like paths and every `$ref` in a
/// bound schema resolves. Issues are reported together.
fn check_document(
    paths: &std::collections::BTreeMap<String, PathItem>,
    raw: &Value,
) -> Result<(), ConfigError> {
    let mut issues = Vec::new();
    for (raw_path, item) in paths {
        if !raw_path.starts_with('/') {
            issues.push(format!("path '{}' must start with '/'", raw_path));
        }
        for (method, op) in item.operations() {
            let mut schemas = Vec::new();
            if let Some(schema) = op.request_schema() {
                schemas.push(("request", schema));
            }
            if let Some(schema) = op.success_response_schema() {
                schemas.push(("response", schema));
            }
            for (kind, schema) in schemas {
                if let Err(err) = validation::inline_refs(schema, raw) {
                    issues.push(format!("{} {}: {} schema: {}", method, raw_path, kind, err));
                }
            }
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::OpenApi(issues.join("; ")))
    }
}

/// Trailing error translation: anything that bubbles up without a JSON body
/// still reaches the client as `{"error", "code"}`.
async fn translate_errors(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }
    let is_json = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);
    if is_json {
        return response;
    }
    let (_parts, body) = response.into_parts();
    let message = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).into_owned(),
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    (status, Json(error_body(&message, status.as_u16()))).into_response()
}

/// Path prefixes from the declared server URLs, deduplicated in order.
fn base_paths(servers: &[ServerObject]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for server in servers {
        let path = match url::Url::parse(&server.url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) if server.url.starts_with('/') => server.url.clone(),
            Err(_) => {
                tracing::warn!(url = %server.url, "unparseable server url, mounting at root");
                "/".to_string()
            }
        };
        let trimmed = path.trim_end_matches('/');
        let base = if trimmed.is_empty() { "/" } else { trimmed };
        if seen.insert(base.to_string()) {
            out.push(base.to_string());
        }
    }
    if out.is_empty() {
        out.push("/".to_string());
    }
    out
}

fn mount_under_servers(router: Router, servers: &[ServerObject]) -> Router {
    let bases = base_paths(servers);
    if bases.iter().all(|b| b == "/") {
        return router;
    }
    let mut mounted = Router::new();
    for base in bases {
        if base == "/" {
            mounted = mounted.merge(router.clone());
        } else {
            mounted = mounted.nest(&base, router.clone());
        }
    }
    mounted
}
