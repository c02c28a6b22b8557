//! febby: configuration-driven REST layer over axum and a Postgres-backed
//! document store, with optional cache-aside reads and OpenAPI route binding.

pub mod app;
pub mod cache;
pub mod collection;
pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod response;
pub mod routes;
pub mod store;

pub use app::Febby;
pub use cache::{cache_key, Cache, CacheError, MemoryCache};
pub use collection::{Collection, DeleteReport, StoreError, UpdateReport};
pub use config::{validate, AppConfig, CacheConfig, DatabaseConfig};
pub use error::{ApiError, AppError, ConfigError};
pub use handlers::crud::{build_projection, CrudContext};
pub use openapi::OpenApiOptions;
pub use routes::{
    bind_crud, common_routes, common_routes_with_ready, handler_fn, middleware_fn, CrudConfig,
    Handler, HttpMethod, Middleware, RouteConfig, RouterBuilder,
};
pub use store::{ensure_collection, PgCollection};
