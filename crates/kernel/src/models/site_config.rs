//! Forum settings table.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// One forum setting.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SiteConfig {
    /// Setting name.
    pub name: String,

    /// Setting value.
    pub value: String,

    /// When this setting was last updated.
    pub updated: chrono::DateTime<chrono::Utc>,
}

impl SiteConfig {
    /// Set a setting.
    pub async fn set(pool: &PgPool, name: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO forum_config (name, value, updated)
            VALUES ($1, $2, NOW())
            ON CONFLICT (name) DO UPDATE SET value = $2, updated = NOW()
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(pool)
        .await
        .context("failed to set forum config")?;

        Ok(())
    }

    /// Get every setting as a map.
    pub async fn all(pool: &PgPool) -> Result<HashMap<String, String>> {
        let rows = sqlx::query_as::<_, SiteConfig>("SELECT name, value, updated FROM forum_config")
            .fetch_all(pool)
            .await
            .context("failed to get all forum config")?;

        Ok(rows.into_iter().map(|c| (c.name, c.value)).collect())
    }
}
