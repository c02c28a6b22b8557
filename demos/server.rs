//! Example server: CRUD over a `pets` collection plus an OpenAPI-bound
//! route, served through the Febby facade.

use axum::extract::Request;
use febby::{
    common_routes, handler_fn, AppConfig, CacheConfig, CrudConfig, DatabaseConfig, Febby,
    OpenApiOptions,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const OPENAPI_DOC: &str = r#"
openapi: 3.0.0
info:
  title: pets
  version: "1.0"
servers:
  - url: /api/v1
paths:
  /status:
    get:
      x-controller: status
      responses:
        "200":
          description: ok
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("febby=info")),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/febby".into());

    let mut config = AppConfig::new(3000);
    config.service_name = Some("petstore".into());
    config.database = Some(DatabaseConfig {
        url: database_url,
        max_connections: 5,
    });
    config.cache = Some(CacheConfig {
        ttl_seconds: Some(600),
    });

    let mut app = Febby::new(config).await?;

    let pets = app.collection("pets").await?;
    app.crud("/pets", CrudConfig::all(), pets)?;

    let options = OpenApiOptions::new().controller(
        "status",
        handler_fn(|_req: Request| async { axum::Json(json!({ "status": "ok" })) }),
    );
    app.bind_openapi(OPENAPI_DOC, &options)?;

    app.router("/", common_routes())?;

    app.listen().await?;
    Ok(())
}
