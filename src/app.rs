//! Febby facade: owns the validated configuration, the main router, the
//! optional database pool and cache. An explicit caller-held value; there is
//! no ambient singleton.

use crate::cache::{Cache, MemoryCache};
use crate::collection::Collection;
use crate::config::{validate, AppConfig, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_SERVICE_NAME};
use crate::error::{AppError, ConfigError};
use crate::handlers::crud::CrudContext;
use crate::openapi::{self, OpenApiOptions};
use crate::routes::{bind_crud, CrudConfig, Middleware, RouteConfig, RouterBuilder};
use crate::store::{ensure_collection, PgCollection};
use axum::{extract::Request, middleware::from_fn, middleware::Next, Router};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

pub struct Febby {
    config: AppConfig,
    builder: RouterBuilder,
    subrouters: Vec<(String, Router)>,
    middlewares: Vec<Middleware>,
    pool: Option<PgPool>,
    cache: Option<Arc<dyn Cache>>,
}

impl Febby {
    /// Validate the config, connect the database pool and build the cache
    /// when configured.
    pub async fn new(raw: AppConfig) -> Result<Self, AppError> {
        let config = validate(raw)?;
        let pool = match &config.database {
            Some(db) => Some(
                PgPoolOptions::new()
                    .max_connections(db.max_connections)
                    .connect(&db.url)
                    .await?,
            ),
            None => None,
        };
        let cache: Option<Arc<dyn Cache>> = config
            .cache
            .as_ref()
            .map(|_| Arc::new(MemoryCache::new()) as Arc<dyn Cache>);
        Ok(Febby {
            config,
            builder: RouterBuilder::new(),
            subrouters: Vec::new(),
            middlewares: Vec::new(),
            pool,
            cache,
        })
    }

    /// Like [`Febby::new`] but with an externally supplied cache client
    /// (e.g. a Redis-backed [`Cache`] implementation).
    pub async fn with_cache(raw: AppConfig, cache: Arc<dyn Cache>) -> Result<Self, AppError> {
        let mut app = Self::new(raw).await?;
        app.cache = Some(cache);
        Ok(app)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    pub fn cache(&self) -> Option<Arc<dyn Cache>> {
        self.cache.clone()
    }

    fn service_name(&self) -> String {
        self.config
            .service_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string())
    }

    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.config
                .cache
                .as_ref()
                .and_then(|c| c.ttl_seconds)
                .unwrap_or(DEFAULT_CACHE_TTL_SECONDS),
        )
    }

    /// Register one route on the main router.
    pub fn route(&mut self, route: RouteConfig) -> Result<(), ConfigError> {
        self.builder.register(route)
    }

    /// App-level middleware, run in registration order around every route.
    pub fn middleware(&mut self, mw: Middleware) {
        self.middlewares.push(mw);
    }

    /// Nest a pre-built router under `path` (merged when `path` is `/`).
    pub fn router(&mut self, path: &str, router: Router) -> Result<(), ConfigError> {
        if path.is_empty() || !path.starts_with('/') {
            return Err(ConfigError::InvalidPath(path.to_string()));
        }
        self.subrouters.push((path.to_string(), router));
        Ok(())
    }

    /// Bind CRUD routes for `collection` under `path`.
    pub fn crud(
        &mut self,
        path: &str,
        config: CrudConfig,
        collection: Arc<dyn Collection>,
    ) -> Result<(), ConfigError> {
        let ctx = CrudContext {
            collection,
            cache: self.cache.clone(),
            service_name: self.service_name(),
            cache_ttl: self.cache_ttl(),
        };
        bind_crud(&mut self.builder, path, config, ctx)
    }

    /// Bind an OpenAPI document (YAML or JSON text) against the supplied
    /// controller/middleware registries.
    pub fn bind_openapi(
        &mut self,
        document: &str,
        options: &OpenApiOptions,
    ) -> Result<(), ConfigError> {
        let router = openapi::bind(document, options)?;
        self.subrouters.push(("/".to_string(), router));
        Ok(())
    }

    /// A [`Collection`] handle backed by the facade's pool, creating the
    /// underlying table when missing.
    pub async fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, AppError> {
        let pool = self
            .pool
            .clone()
            .ok_or(ConfigError::DatabaseNotConfigured)?;
        ensure_collection(&pool, name).await?;
        let collection = PgCollection::new(pool, name)?;
        Ok(Arc::new(collection))
    }

    /// Compose everything into the final router.
    pub fn into_router(self) -> Router {
        let Febby {
            config,
            builder,
            subrouters,
            middlewares,
            ..
        } = self;

        let mut router = builder.finish();
        for (path, sub) in subrouters {
            router = if path == "/" {
                router.merge(sub)
            } else {
                router.nest(&path, sub)
            };
        }
        // Last-applied layer is outermost: user middlewares wrap routes in
        // list order, the default stack wraps everything.
        for mw in middlewares.into_iter().rev() {
            router = router.layer(from_fn(move |req: Request, next: Next| mw(req, next)));
        }
        if config.load_default_middleware.unwrap_or(true) {
            router = router
                .layer(RequestBodyLimitLayer::new(DEFAULT_BODY_LIMIT_BYTES))
                .layer(CorsLayer::permissive())
                .layer(TraceLayer::new_for_http());
        }
        match config.base_path.as_deref() {
            Some("/") | None => router,
            Some(base) => Router::new().nest(base, router),
        }
    }

    /// Serve until ctrl-c.
    pub async fn listen(self) -> Result<(), AppError> {
        self.listen_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Serve until `signal` completes; in-flight requests drain per the
    /// underlying server's behavior.
    pub async fn listen_with_shutdown(
        self,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), AppError> {
        let port = self.config.port;
        let app = self.into_router();
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }
}
