//! PostgreSQL user store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Provisioned, UserStore};
use crate::models::{ForumUser, NewForumUser};

/// User store over the `forum_user` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ForumUser>> {
        let user = sqlx::query_as::<_, ForumUser>("SELECT * FROM forum_user WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch forum user by id")?;

        Ok(user)
    }

    async fn find_by_host_id(&self, host_id: i64) -> Result<Option<ForumUser>> {
        let user =
            sqlx::query_as::<_, ForumUser>("SELECT * FROM forum_user WHERE inherited_id = $1")
                .bind(host_id)
                .fetch_optional(&self.pool)
                .await
                .context("failed to fetch forum user by host id")?;

        Ok(user)
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM forum_user")
            .fetch_one(&self.pool)
            .await
            .context("failed to count forum users")?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn create_inherited(&self, new: NewForumUser) -> Result<Provisioned> {
        let host_id = new
            .inherited_id
            .context("inherited user requires a host id")?;
        let user = new.into_user();

        // The unique index on inherited_id settles concurrent first requests.
        let inserted = sqlx::query_as::<_, ForumUser>(
            r#"
            INSERT INTO forum_user (id, inherited_id, username, email, status, role, timezone, created)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (inherited_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(user.inherited_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.status.as_i16())
        .bind(user.role.as_i16())
        .bind(&user.timezone)
        .bind(user.created)
        .fetch_optional(&self.pool)
        .await
        .context("failed to create inherited forum user")?;

        if let Some(created) = inserted {
            return Ok(Provisioned::Created(created));
        }

        let existing = self
            .find_by_host_id(host_id)
            .await?
            .context("inherited forum user vanished after insert conflict")?;
        Ok(Provisioned::Existing(existing))
    }
}

impl std::fmt::Debug for PgUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgUserStore").finish()
    }
}
