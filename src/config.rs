//! Environment-driven configuration.
//!
//! Values come from the process environment, with a `.env` file loaded first
//! when present.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "APP_PORT", 3000u16)?;

        let url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5u32)?;
        let run_migrations = parse_or(&lookup, "RUN_MIGRATIONS", true)?;

        let region_ttl = Duration::from_secs(parse_or(&lookup, "REGION_CACHE_TTL_SECS", 30 * 60u64)?);
        let refresh_interval =
            Duration::from_secs(parse_or(&lookup, "REGION_CACHE_REFRESH_SECS", 10 * 60u64)?);
        if refresh_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "REGION_CACHE_REFRESH_SECS",
                value: "0".to_string(),
            });
        }

        let log_level = lookup("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url,
                max_connections,
                run_migrations,
            },
            cache: CacheConfig {
                region_ttl,
                refresh_interval,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::Invalid {
            key: "APP_HOST",
            value: self.host.clone(),
        })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Database connection settings. No URL means the in-memory store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

/// Region cache lifetimes.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub region_ttl: Duration,
    pub refresh_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            region_ttl: Duration::from_secs(30 * 60),
            refresh_interval: Duration::from_secs(10 * 60),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.run_migrations);
        assert_eq!(config.cache.region_ttl, Duration::from_secs(1800));
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = config_from(&[
            ("APP_PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/quotes"),
            ("RUN_MIGRATIONS", "false"),
            ("REGION_CACHE_TTL_SECS", "60"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/quotes"));
        assert!(!config.database.run_migrations);
        assert_eq!(config.cache.region_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_blank_database_url_means_memory_store() {
        let config = config_from(&[("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(config.database.url, None);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = config_from(&[("APP_PORT", "eighty")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value 'eighty' for APP_PORT");
    }

    #[test]
    fn test_zero_refresh_interval_is_rejected() {
        assert!(config_from(&[("REGION_CACHE_REFRESH_SECS", "0")]).is_err());
    }

    #[test]
    fn test_socket_addr_resolves_localhost() {
        let server = ServerConfig {
            host: "localhost".to_string(),
            port: 4000,
        };
        assert_eq!(server.socket_addr().unwrap().to_string(), "127.0.0.1:4000");

        let bad = ServerConfig {
            host: "not a host".to_string(),
            port: 4000,
        };
        assert!(bad.socket_addr().is_err());
    }
}
