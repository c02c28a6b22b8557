//! Application configuration as supplied by the caller, before validation.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds an entity stays cached after a read-through write.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

/// Facade configuration. Optional fields are filled by
/// [`validate`](crate::config::validate); the result is owned by the facade
/// and immutable for its lifetime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    /// URL prefix the whole app mounts under. Default `/`.
    #[serde(default)]
    pub base_path: Option<String>,
    /// Used as the first component of cache keys. Default `febby`.
    #[serde(default)]
    pub service_name: Option<String>,
    /// Apply the built-in trace/CORS/body-limit stack. Default true.
    #[serde(default)]
    pub load_default_middleware: Option<bool>,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
}

impl AppConfig {
    pub fn new(port: u16) -> Self {
        AppConfig {
            port,
            base_path: None,
            service_name: None,
            load_default_middleware: None,
            database: None,
            cache: None,
        }
    }
}
