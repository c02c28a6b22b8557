//! CRUD binding: maps a [`CrudConfig`] onto registrar calls.
//!
//! `crud: true` mounts the whole handler set at conventional paths. The
//! per-operation form mounts only the listed operations, each with the
//! shared middleware list followed by its own extras. Binding is
//! all-or-nothing: every route is checked before any route mounts.

use crate::error::ConfigError;
use crate::handlers::crud::{
    create_handler, delete_handler, get_by_id_handler, list_handler, update_handler, CrudContext,
};
use crate::routes::registrar::{Handler, HttpMethod, Middleware, RouteConfig, RouterBuilder};

/// Which CRUD operations to expose and with what middleware. Consumed once
/// at binding time.
#[derive(Default)]
pub struct CrudConfig {
    /// Enable the full handler set. Per-operation fields are ignored.
    pub crud: bool,
    /// Applied to every bound operation, in order, ahead of the extras.
    pub middlewares: Vec<Middleware>,
    pub get: Option<Vec<Middleware>>,
    pub put: Option<Vec<Middleware>>,
    pub post: Option<Vec<Middleware>>,
    pub delete: Option<Vec<Middleware>>,
}

impl CrudConfig {
    /// All five operations, shared middlewares only.
    pub fn all() -> Self {
        CrudConfig {
            crud: true,
            ..Default::default()
        }
    }

    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.middlewares.push(mw);
        self
    }

    pub fn get(mut self, extra: Vec<Middleware>) -> Self {
        self.get = Some(extra);
        self
    }

    pub fn put(mut self, extra: Vec<Middleware>) -> Self {
        self.put = Some(extra);
        self
    }

    pub fn post(mut self, extra: Vec<Middleware>) -> Self {
        self.post = Some(extra);
        self
    }

    pub fn delete(mut self, extra: Vec<Middleware>) -> Self {
        self.delete = Some(extra);
        self
    }
}

/// Register the configured CRUD routes for `ctx`'s collection under `path`.
/// GET/POST mount at `path`, GET/PUT/DELETE at `path/:id`.
pub fn bind_crud(
    builder: &mut RouterBuilder,
    path: &str,
    config: CrudConfig,
    ctx: CrudContext,
) -> Result<(), ConfigError> {
    if path.is_empty() || !path.starts_with('/') {
        return Err(ConfigError::InvalidPath(path.to_string()));
    }
    let base = path.trim_end_matches('/');
    let base_path = if base.is_empty() { "/".to_string() } else { base.to_string() };
    let id_path = format!("{}/:id", base);

    let mut planned: Vec<(HttpMethod, String, Vec<Middleware>, Handler)> = Vec::new();
    let chain = |extra: &[Middleware]| -> Vec<Middleware> {
        config
            .middlewares
            .iter()
            .cloned()
            .chain(extra.iter().cloned())
            .collect()
    };

    if config.crud {
        let shared = chain(&[]);
        planned.push((HttpMethod::Get, base_path.clone(), shared.clone(), list_handler(ctx.clone())));
        planned.push((HttpMethod::Post, base_path.clone(), shared.clone(), create_handler(ctx.clone())));
        planned.push((HttpMethod::Get, id_path.clone(), shared.clone(), get_by_id_handler(ctx.clone())));
        planned.push((HttpMethod::Put, id_path.clone(), shared.clone(), update_handler(ctx.clone())));
        planned.push((HttpMethod::Delete, id_path.clone(), shared, delete_handler(ctx)));
    } else {
        if let Some(extra) = &config.get {
            planned.push((HttpMethod::Get, id_path.clone(), chain(extra), get_by_id_handler(ctx.clone())));
        }
        if let Some(extra) = &config.put {
            planned.push((HttpMethod::Put, id_path.clone(), chain(extra), update_handler(ctx.clone())));
        }
        if let Some(extra) = &config.post {
            planned.push((HttpMethod::Post, base_path.clone(), chain(extra), create_handler(ctx.clone())));
        }
        if let Some(extra) = &config.delete {
            planned.push((HttpMethod::Delete, id_path.clone(), chain(extra), delete_handler(ctx.clone())));
        }
    }

    for (method, path, _, _) in &planned {
        if builder.contains(*method, path) {
            return Err(ConfigError::DuplicateRoute {
                method: method.as_str().to_string(),
                path: path.clone(),
            });
        }
    }

    for (method, path, middlewares, handler) in planned {
        let mut route = RouteConfig::new(method.as_str(), path).handler(handler);
        route.middlewares = middlewares;
        builder.register(route)?;
    }
    Ok(())
}
