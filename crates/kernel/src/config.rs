//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::gate::DEFAULT_TIMEZONE;
use crate::users::UserSource;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Redis connection URL.
    pub redis_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "strict").
    pub cookie_same_site: String,

    /// Where forum identities come from (AGORA_USER_SOURCE, default: inherit).
    pub user_source: UserSource,

    /// Timezone for new inherited accounts and for visitors without one.
    pub default_timezone: String,

    /// How long forum settings are cached (default: 30 seconds).
    pub config_cache_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "strict".to_string())
            .to_lowercase();

        let user_source = env::var("AGORA_USER_SOURCE")
            .unwrap_or_else(|_| "inherit".to_string())
            .parse()
            .context("AGORA_USER_SOURCE must be 'inherit' or 'own'")?;

        let default_timezone = env::var("AGORA_DEFAULT_TIMEZONE")
            .ok()
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

        let config_cache_secs: u64 = env::var("AGORA_CONFIG_CACHE_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("AGORA_CONFIG_CACHE_SECS must be a valid u64")?;

        Ok(Self {
            port,
            database_url,
            redis_url,
            database_max_connections,
            cookie_same_site,
            user_source,
            default_timezone,
            config_cache_ttl: Duration::from_secs(config_cache_secs),
        })
    }
}
