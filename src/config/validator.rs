//! Config validation: default filling and base-path checks.

use crate::config::AppConfig;
use crate::error::ConfigError;

pub const DEFAULT_BASE_PATH: &str = "/";
pub const DEFAULT_SERVICE_NAME: &str = "febby";
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 600;

/// Fill unset optional fields with documented defaults. Pure and idempotent:
/// validating an already-validated config changes nothing.
pub fn validate(mut config: AppConfig) -> Result<AppConfig, ConfigError> {
    let base_path = config
        .base_path
        .take()
        .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());
    if !base_path.starts_with('/') {
        return Err(ConfigError::InvalidBasePath(base_path));
    }
    config.base_path = Some(base_path);

    config.service_name = Some(
        config
            .service_name
            .take()
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
    );
    config.load_default_middleware = Some(config.load_default_middleware.unwrap_or(true));
    if let Some(cache) = config.cache.as_mut() {
        cache.ttl_seconds = Some(cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECONDS));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    #[test]
    fn fills_defaults() {
        let config = validate(AppConfig::new(3000)).unwrap();
        assert_eq!(config.base_path.as_deref(), Some("/"));
        assert_eq!(config.service_name.as_deref(), Some("febby"));
        assert_eq!(config.load_default_middleware, Some(true));
        assert!(config.cache.is_none());
    }

    #[test]
    fn keeps_supplied_values() {
        let mut raw = AppConfig::new(3000);
        raw.base_path = Some("/api".into());
        raw.service_name = Some("pets".into());
        raw.load_default_middleware = Some(false);
        raw.cache = Some(CacheConfig { ttl_seconds: Some(30) });
        let config = validate(raw).unwrap();
        assert_eq!(config.base_path.as_deref(), Some("/api"));
        assert_eq!(config.service_name.as_deref(), Some("pets"));
        assert_eq!(config.load_default_middleware, Some(false));
        assert_eq!(config.cache.unwrap().ttl_seconds, Some(30));
    }

    #[test]
    fn cache_ttl_defaults_when_cache_enabled() {
        let mut raw = AppConfig::new(3000);
        raw.cache = Some(CacheConfig::default());
        let config = validate(raw).unwrap();
        assert_eq!(config.cache.unwrap().ttl_seconds, Some(600));
    }

    #[test]
    fn idempotent() {
        let once = validate(AppConfig::new(8080)).unwrap();
        let twice = validate(once.clone()).unwrap();
        assert_eq!(format!("{:?}", once), format!("{:?}", twice));
    }

    #[test]
    fn rejects_relative_base_path() {
        let mut raw = AppConfig::new(3000);
        raw.base_path = Some("api".into());
        assert!(matches!(
            validate(raw),
            Err(ConfigError::InvalidBasePath(_))
        ));
    }
}
