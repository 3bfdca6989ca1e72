//! Capability checks with DashMap-based caching.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ForumUser, Role};

/// Something a forum user may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Full administrator access, including access during maintenance.
    Administrator,
    /// Moderate threads and posts.
    Moderate,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Administrator => "administrator",
            Capability::Moderate => "moderate",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "administrator" => Some(Capability::Administrator),
            "moderate" => Some(Capability::Moderate),
            _ => None,
        }
    }
}

impl std::str::FromStr for Capability {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s.trim())
            .with_context(|| format!("unknown capability '{s}', expected 'administrator' or 'moderate'"))
    }
}

/// Capabilities every user with the role holds.
pub fn role_grants(role: Role) -> &'static [Capability] {
    match role {
        Role::Admin => &[Capability::Administrator, Capability::Moderate],
        Role::Moderator => &[Capability::Moderate],
        Role::Member => &[],
    }
}

/// Answers whether the current user holds a capability.
#[async_trait]
pub trait Capabilities: Send + Sync {
    /// Guests (`None`) hold no capabilities.
    async fn has(&self, user: Option<&ForumUser>, capability: Capability) -> Result<bool>;
}

/// Grants derived from the user's role only.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleCapabilities;

#[async_trait]
impl Capabilities for RoleCapabilities {
    async fn has(&self, user: Option<&ForumUser>, capability: Capability) -> Result<bool> {
        Ok(user.is_some_and(|u| role_grants(u.role).contains(&capability)))
    }
}

/// Permission cache entry.
#[derive(Debug, Clone)]
struct CachedGrants {
    capabilities: HashSet<Capability>,
}

/// Role grants plus per-user grants from `forum_permission`.
#[derive(Clone)]
pub struct PermissionService {
    inner: Arc<PermissionServiceInner>,
}

struct PermissionServiceInner {
    /// Cache of user_id -> explicit grants.
    user_cache: DashMap<Uuid, CachedGrants>,

    /// Database pool for cache misses.
    pool: PgPool,
}

impl PermissionService {
    /// Create a new permission service.
    pub fn new(pool: PgPool) -> Self {
        Self {
            inner: Arc::new(PermissionServiceInner {
                user_cache: DashMap::new(),
                pool,
            }),
        }
    }

    async fn load_user_grants(&self, user_id: Uuid) -> Result<HashSet<Capability>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT capability FROM forum_permission WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.inner.pool)
                .await
                .context("failed to load user capabilities")?;

        Ok(rows.iter().filter_map(|c| Capability::parse(c)).collect())
    }

    /// Grant a capability to a single user.
    pub async fn grant(&self, user_id: Uuid, capability: Capability) -> Result<()> {
        sqlx::query(
            "INSERT INTO forum_permission (user_id, capability) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(capability.as_str())
        .execute(&self.inner.pool)
        .await
        .context("failed to grant capability")?;

        self.invalidate_user(user_id);
        Ok(())
    }

    fn invalidate_user(&self, user_id: Uuid) {
        self.inner.user_cache.remove(&user_id);
    }

    /// Get the number of cached entries (for monitoring).
    pub fn cache_size(&self) -> usize {
        self.inner.user_cache.len()
    }
}

#[async_trait]
impl Capabilities for PermissionService {
    async fn has(&self, user: Option<&ForumUser>, capability: Capability) -> Result<bool> {
        let Some(user) = user else {
            return Ok(false);
        };

        if role_grants(user.role).contains(&capability) {
            return Ok(true);
        }

        if let Some(cached) = self.inner.user_cache.get(&user.id) {
            return Ok(cached.capabilities.contains(&capability));
        }

        let capabilities = self.load_user_grants(user.id).await?;
        let granted = capabilities.contains(&capability);
        self.inner
            .user_cache
            .insert(user.id, CachedGrants { capabilities });

        Ok(granted)
    }
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionService")
            .field("cached_users", &self.cache_size())
            .finish()
    }
}
