//! Database-backed settings with a moka read-through cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use super::{ConfigProvider, ConfigStore, default_value};
use crate::models::SiteConfig;

const ALL_KEY: &str = "all";

/// Settings stored in the `forum_config` table.
///
/// The whole table is cached as one entry; writes through [`Self::set`]
/// drop it, writes from other nodes show up after the TTL.
#[derive(Clone)]
pub struct SiteConfigStore {
    pool: PgPool,
    cache: Cache<&'static str, Arc<HashMap<String, String>>>,
}

impl SiteConfigStore {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { pool, cache }
    }

    async fn snapshot(&self) -> Result<Arc<HashMap<String, String>>> {
        if let Some(all) = self.cache.get(ALL_KEY).await {
            return Ok(all);
        }

        let all = Arc::new(SiteConfig::all(&self.pool).await?);
        debug!(entries = all.len(), "forum config loaded");
        self.cache.insert(ALL_KEY, all.clone()).await;
        Ok(all)
    }
}

#[async_trait]
impl ConfigProvider for SiteConfigStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let all = self.snapshot().await?;
        Ok(all
            .get(key)
            .cloned()
            .or_else(|| default_value(key).map(String::from)))
    }
}

#[async_trait]
impl ConfigStore for SiteConfigStore {
    /// Store a setting and drop the cached snapshot.
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        SiteConfig::set(&self.pool, key, value).await?;
        self.cache.invalidate(ALL_KEY).await;
        debug!(key = %key, "forum config updated");
        Ok(())
    }

    async fn all(&self) -> Result<HashMap<String, String>> {
        Ok(self.snapshot().await?.as_ref().clone())
    }
}

impl std::fmt::Debug for SiteConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteConfigStore").finish()
    }
}
