//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use redis::Client as RedisClient;
use sqlx::PgPool;
use tracing::info;

use crate::cache::CacheLayer;
use crate::config::Config;
use crate::config_storage::{ConfigStore, SiteConfigStore};
use crate::db;
use crate::gate::Gate;
use crate::permissions::PermissionService;
use crate::services::AuditService;
use crate::users::PgUserStore;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool, absent for in-process deployments.
    db: Option<PgPool>,

    /// Redis client for sessions and caching.
    redis: Option<RedisClient>,

    /// Request gate run before every forum action.
    gate: Gate,

    /// Writable view of the forum settings the gate reads.
    settings: Arc<dyn ConfigStore>,

    /// Page data cache, shared with the gate's invalidation.
    cache: CacheLayer,
}

impl AppState {
    /// Create application state backed by PostgreSQL and Redis.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        let redis = RedisClient::open(config.redis_url.as_str())
            .context("failed to create Redis client")?;

        let mut conn = redis
            .get_multiplexed_async_connection()
            .await
            .context("failed to connect to Redis")?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("Redis PING failed")?;

        let settings = Arc::new(SiteConfigStore::new(db.clone(), config.config_cache_ttl));
        let cache = CacheLayer::new(redis.clone());

        let gate = Gate::new(
            settings.clone(),
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PermissionService::new(db.clone())),
        )
        .with_audit(Arc::new(AuditService::new(db.clone())))
        .with_cache(Arc::new(cache.clone()))
        .with_user_source(config.user_source)
        .with_default_timezone(config.default_timezone.clone());

        info!(
            user_source = ?config.user_source,
            module_version = %gate.module_version(),
            "request gate configured"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db: Some(db),
                redis: Some(redis),
                gate,
                settings,
                cache,
            }),
        })
    }

    /// Create state from an already assembled gate, without external stores.
    ///
    /// `cache` should be the layer the gate invalidates, so pages see the
    /// gate's invalidations.
    pub fn from_parts(gate: Gate, settings: Arc<dyn ConfigStore>, cache: CacheLayer) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db: None,
                redis: None,
                gate,
                settings,
                cache,
            }),
        }
    }

    pub fn gate(&self) -> &Gate {
        &self.inner.gate
    }

    pub fn settings(&self) -> &Arc<dyn ConfigStore> {
        &self.inner.settings
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.inner.cache
    }

    /// Check if PostgreSQL is healthy. `None` when not configured.
    pub async fn postgres_healthy(&self) -> Option<bool> {
        let db = self.inner.db.as_ref()?;
        Some(db::check_health(db).await)
    }

    /// Check if Redis is healthy. `None` when not configured.
    pub async fn redis_healthy(&self) -> Option<bool> {
        let redis = self.inner.redis.as_ref()?;
        let Ok(mut conn) = redis.get_multiplexed_async_connection().await else {
            return Some(false);
        };

        Some(
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .is_ok(),
        )
    }
}
