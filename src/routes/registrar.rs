//! Route registration: validates a (method, path, middlewares, handler)
//! tuple and mounts it. All higher-level binders (CRUD, OpenAPI) funnel
//! through [`RouterBuilder::register`], so every mounted route has passed
//! the same precondition checks.

use crate::error::ConfigError;
use axum::{
    extract::Request,
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Terminal request handler. Stored in registries by name for OpenAPI
/// binding, so it must be callable-by-value and cheaply cloneable.
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<Response> + Send + Sync>;

/// Middleware in the chain ahead of a handler.
pub type Middleware = Arc<dyn Fn(Request, Next) -> BoxFuture<Response> + Send + Sync>;

/// Wrap an async fn into a [`Handler`].
pub fn handler_fn<F, Fut, R>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |req| {
        let fut = f(req);
        Box::pin(async move { fut.await.into_response() })
    })
}

/// Wrap an async fn into a [`Middleware`].
pub fn middleware_fn<F, Fut, R>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |req, next| {
        let fut = f(req, next);
        Box::pin(async move { fut.await.into_response() })
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::MissingMethod);
        }
        match raw.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "put" => Ok(HttpMethod::Put),
            "post" => Ok(HttpMethod::Post),
            "delete" => Ok(HttpMethod::Delete),
            "patch" => Ok(HttpMethod::Patch),
            "head" => Ok(HttpMethod::Head),
            "options" => Ok(HttpMethod::Options),
            _ => Err(ConfigError::InvalidMethod(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }

    fn filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Delete => MethodFilter::DELETE,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Head => MethodFilter::HEAD,
            HttpMethod::Options => MethodFilter::OPTIONS,
        }
    }
}

/// One route to mount. Consumed at registration time, not retained.
pub struct RouteConfig {
    pub method: String,
    pub path: String,
    pub middlewares: Vec<Middleware>,
    pub handler: Option<Handler>,
}

impl RouteConfig {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        RouteConfig {
            method: method.into(),
            path: path.into(),
            middlewares: Vec::new(),
            handler: None,
        }
    }

    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.middlewares.push(mw);
        self
    }

    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }
}

/// Accumulates validated routes and folds them into an [`axum::Router`].
/// Grouping per path keeps multiple methods on one path from clashing.
#[derive(Default)]
pub struct RouterBuilder {
    routes: BTreeMap<String, MethodRouter>,
    seen: HashSet<(HttpMethod, String)>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate preconditions, then mount middlewares in list order with the
    /// handler last. Nothing is mounted when any precondition fails.
    pub fn register(&mut self, route: RouteConfig) -> Result<(), ConfigError> {
        let method = HttpMethod::parse(&route.method)?;
        if route.path.is_empty() || !route.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(route.path));
        }
        let handler = route.handler.ok_or_else(|| ConfigError::MissingHandler {
            method: method.as_str().to_string(),
            path: route.path.clone(),
        })?;
        if !self.seen.insert((method, route.path.clone())) {
            return Err(ConfigError::DuplicateRoute {
                method: method.as_str().to_string(),
                path: route.path,
            });
        }

        let mut method_router = on(method.filter(), move |req: Request| handler(req));
        // Last-applied layer is outermost, so reverse to run list order.
        for mw in route.middlewares.into_iter().rev() {
            method_router =
                method_router.layer(from_fn(move |req: Request, next: Next| mw(req, next)));
        }

        let merged = match self.routes.remove(&route.path) {
            Some(existing) => existing.merge(method_router),
            None => method_router,
        };
        self.routes.insert(route.path, merged);
        Ok(())
    }

    /// True when (method, path) is already taken. Lets batch binders check
    /// every route up front and fail before mounting anything.
    pub fn contains(&self, method: HttpMethod, path: &str) -> bool {
        self.seen.contains(&(method, path.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Number of (method, path) registrations so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn finish(self) -> Router {
        let mut router = Router::new();
        for (path, method_router) in self.routes {
            router = router.route(&path, method_router);
        }
        router
    }
}
