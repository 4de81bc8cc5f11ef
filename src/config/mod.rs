use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_access_token_expiry_secs: i64,
    pub frontend_url: String,
    pub cache: CacheConfig,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

/// Response cache settings. TTLs are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub key_prefix: String,
    pub ttl_live_secs: u64,
    pub ttl_standard_secs: u64,
    pub ttl_extended_secs: u64,
    pub ttl_historical_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: "wth".to_string(),
            ttl_live_secs: 60,
            ttl_standard_secs: 300,
            ttl_extended_secs: 900,
            ttl_historical_secs: 3600,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("BACKEND_PORT", 3000),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_access_token_expiry_secs: parse_or("JWT_ACCESS_TOKEN_EXPIRY_SECS", 900),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "https://localhost:5173".to_string()),
            cache: CacheConfig::from_env(),
            tls_cert_path: env::var("TLS_CERT_PATH").ok().filter(|v| !v.is_empty()),
            tls_key_path: env::var("TLS_KEY_PATH").ok().filter(|v| !v.is_empty()),
        })
    }

    /// Both certificate and key paths, when TLS is configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_str(), key.as_str())),
            _ => None,
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.enabled),
            key_prefix: env::var("CACHE_KEY_PREFIX")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.key_prefix),
            ttl_live_secs: parse_or("CACHE_TTL_LIVE_SECS", defaults.ttl_live_secs),
            ttl_standard_secs: parse_or("CACHE_TTL_STANDARD_SECS", defaults.ttl_standard_secs),
            ttl_extended_secs: parse_or("CACHE_TTL_EXTENDED_SECS", defaults.ttl_extended_secs),
            ttl_historical_secs: parse_or(
                "CACHE_TTL_HISTORICAL_SECS",
                defaults.ttl_historical_secs,
            ),
        }
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" YES "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn cache_defaults() {
        let cache = CacheConfig::default();
        assert!(cache.enabled);
        assert_eq!(cache.key_prefix, "wth");
        assert!(cache.ttl_live_secs < cache.ttl_standard_secs);
        assert!(cache.ttl_standard_secs < cache.ttl_extended_secs);
        assert!(cache.ttl_extended_secs < cache.ttl_historical_secs);
    }

    #[test]
    fn tls_paths_require_both() {
        let mut config = AppConfig {
            database_url: String::new(),
            database_max_connections: 1,
            redis_url: String::new(),
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: "s".to_string(),
            jwt_access_token_expiry_secs: 900,
            frontend_url: String::new(),
            cache: CacheConfig::default(),
            tls_cert_path: Some("cert.pem".to_string()),
            tls_key_path: None,
        };
        assert!(config.tls_paths().is_none());
        config.tls_key_path = Some("key.pem".to_string());
        assert_eq!(config.tls_paths(), Some(("cert.pem", "key.pem")));
    }
}
