//! Two-tier cache with Moka (L1) and Redis (L2).
//!
//! Entries are registered under tags; forum events clear the tags whose
//! data they make stale.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use redis::AsyncCommands;
use redis::Client as RedisClient;
use tracing::{debug, warn};

/// Default TTL for L1 cache (60 seconds).
const L1_TTL_SECS: u64 = 60;

/// Default TTL for L2 cache (5 minutes).
const L2_TTL_SECS: u64 = 300;

/// Maximum L1 cache capacity.
const L1_MAX_CAPACITY: u64 = 10_000;

/// Cache tags.
pub mod tags {
    /// Member list columns.
    pub const MEMBERS_FIELDLIST: &str = "members.fieldlist";
    /// Member counter shown on the forum index.
    pub const MEMBERS_COUNT: &str = "forum.memberscount";
}

/// Forum events that make cached data stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    /// A member account became active.
    Activate,
}

impl CacheEvent {
    /// Tags cleared by this event.
    pub fn tags(self) -> &'static [&'static str] {
        match self {
            CacheEvent::Activate => &[tags::MEMBERS_FIELDLIST, tags::MEMBERS_COUNT],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CacheEvent::Activate => "activate",
        }
    }
}

/// Clears cached data after forum events.
#[async_trait]
pub trait CacheInvalidation: Send + Sync {
    async fn clear_after(&self, event: CacheEvent);
}

/// Two-tier cache layer.
///
/// L1 (Moka): In-process, short TTL, per-instance
/// L2 (Redis): Shared across instances, longer TTL. Optional.
#[derive(Clone)]
pub struct CacheLayer {
    inner: Arc<CacheLayerInner>,
}

struct CacheLayerInner {
    /// L1 in-process cache.
    local: Cache<String, String>,

    /// Tag -> keys registered in L1.
    local_tags: DashMap<String, HashSet<String>>,

    /// L2 Redis client.
    redis: Option<RedisClient>,
}

impl CacheLayer {
    /// Create a cache layer with a Redis L2.
    pub fn new(redis: RedisClient) -> Self {
        Self::build(Some(redis))
    }

    /// Create an in-process cache without L2.
    pub fn local() -> Self {
        Self::build(None)
    }

    fn build(redis: Option<RedisClient>) -> Self {
        let local = Cache::builder()
            .max_capacity(L1_MAX_CAPACITY)
            .time_to_live(Duration::from_secs(L1_TTL_SECS))
            .build();

        Self {
            inner: Arc::new(CacheLayerInner {
                local,
                local_tags: DashMap::new(),
                redis,
            }),
        }
    }

    async fn redis_conn(&self) -> Option<redis::aio::MultiplexedConnection> {
        let redis = self.inner.redis.as_ref()?;
        match redis.get_multiplexed_async_connection().await {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(error = %e, "failed to get Redis connection for cache");
                None
            }
        }
    }

    /// Get a value from cache.
    ///
    /// Checks L1 first, then L2. On L2 hit, populates L1.
    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(val) = self.inner.local.get(key).await {
            debug!(key = %key, "cache L1 hit");
            return Some(val);
        }

        let mut conn = self.redis_conn().await?;
        let val: Option<String> = conn.get(key).await.ok()?;

        if let Some(ref v) = val {
            debug!(key = %key, "cache L2 hit, populating L1");
            self.inner.local.insert(key.to_string(), v.clone()).await;
        }

        val
    }

    /// Set a value in cache with TTL and tags.
    ///
    /// Writes to both L1 and L2.
    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64, tags: &[&str]) {
        self.inner
            .local
            .insert(key.to_string(), value.to_string())
            .await;
        for tag in tags {
            self.inner
                .local_tags
                .entry((*tag).to_string())
                .or_default()
                .insert(key.to_string());
        }

        let Some(mut conn) = self.redis_conn().await else {
            return;
        };

        let ttl = if ttl_secs > 0 { ttl_secs } else { L2_TTL_SECS };

        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl).await {
            warn!(error = %e, key = %key, "failed to set cache value in Redis");
            return;
        }

        for tag in tags {
            let tag_key = format!("tag:{tag}");
            if let Err(e) = conn.sadd::<_, _, ()>(&tag_key, key).await {
                warn!(error = %e, tag = %tag, "failed to register cache key with tag");
            }
        }

        debug!(key = %key, tags = ?tags, ttl = %ttl, "cache set");
    }

    /// Invalidate all cache keys associated with a tag.
    ///
    /// Uses Lua script for atomic operation on L2.
    pub async fn invalidate_tag(&self, tag: &str) {
        let mut keys: HashSet<String> = self
            .inner
            .local_tags
            .remove(tag)
            .map(|(_, keys)| keys)
            .unwrap_or_default();

        let tag_key = format!("tag:{tag}");
        let mut conn = self.redis_conn().await;

        if let Some(conn) = conn.as_mut() {
            match conn.smembers::<_, Vec<String>>(&tag_key).await {
                Ok(remote) => keys.extend(remote),
                Err(e) => warn!(error = %e, tag = %tag, "failed to get tag members"),
            }
        }

        for key in &keys {
            self.inner.local.invalidate(key).await;
        }

        if let Some(conn) = conn.as_mut() {
            let script = redis::Script::new(INVALIDATE_TAG_SCRIPT);
            if let Err(e) = script.key(&tag_key).invoke_async::<()>(conn).await {
                warn!(error = %e, tag = %tag, "failed to invalidate tag in Redis");
                return;
            }
        }

        debug!(tag = %tag, keys_invalidated = %keys.len(), "tag invalidated");
    }
}

#[async_trait]
impl CacheInvalidation for CacheLayer {
    async fn clear_after(&self, event: CacheEvent) {
        for tag in event.tags() {
            self.invalidate_tag(tag).await;
        }
        debug!(event = event.name(), "cache cleared after event");
    }
}

/// Lua script for atomic tag invalidation.
///
/// Gets all keys in the tag set, deletes them, then deletes the tag set.
const INVALIDATE_TAG_SCRIPT: &str = r#"
local keys = redis.call("SMEMBERS", KEYS[1])
if #keys > 0 then
    redis.call("DEL", unpack(keys))
end
redis.call("DEL", KEYS[1])
return #keys
"#;

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("l2", &self.inner.redis.is_some())
            .finish()
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_set_and_get() {
        let cache = CacheLayer::local();
        cache.set("forum:index", "<html>", 0, &["forum.index"]).await;
        assert_eq!(cache.get("forum:index").await.as_deref(), Some("<html>"));

        cache.invalidate_tag("forum.index").await;
        assert!(cache.get("forum:index").await.is_none());
    }

    #[tokio::test]
    async fn activate_clears_member_tags() {
        let cache = CacheLayer::local();
        cache
            .set("members:columns", "id,name", 0, &[tags::MEMBERS_FIELDLIST])
            .await;
        cache.set("members:count", "12", 0, &[tags::MEMBERS_COUNT]).await;
        cache.set("threads:count", "40", 0, &["forum.threadscount"]).await;

        cache.clear_after(CacheEvent::Activate).await;

        assert!(cache.get("members:columns").await.is_none());
        assert!(cache.get("members:count").await.is_none());
        assert_eq!(cache.get("threads:count").await.as_deref(), Some("40"));
    }

    #[tokio::test]
    async fn test_cache_layer_creation() {
        let client = RedisClient::open("redis://127.0.0.1:6379").unwrap();
        let cache = CacheLayer::new(client);

        assert!(format!("{cache:?}").contains("l2: true"));
        assert!(format!("{:?}", CacheLayer::local()).contains("l2: false"));
    }
}
