//! Forum audit log.
//!
//! Records notable account events in `forum_log` and mirrors them to tracing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

/// Audit log sink.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record an informational entry about `subject_id`, raised by `origin`.
    async fn info(&self, message: &str, subject_id: Uuid, origin: &str) -> Result<()>;
}

/// Audit log backed by the `forum_log` table.
#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    /// Create a new audit service.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for AuditService {
    async fn info(&self, message: &str, subject_id: Uuid, origin: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO forum_log (level, message, subject_id, origin, created)
            VALUES ('info', $1, $2, $3, NOW())
            "#,
        )
        .bind(message)
        .bind(subject_id)
        .bind(origin)
        .execute(&self.pool)
        .await
        .context("failed to write forum log")?;

        debug!(
            message = %message,
            subject_id = %subject_id,
            origin = %origin,
            "forum log entry created"
        );

        Ok(())
    }
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish()
    }
}

/// Audit log that only emits tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

#[async_trait]
impl AuditLog for TracingAudit {
    async fn info(&self, message: &str, subject_id: Uuid, origin: &str) -> Result<()> {
        info!(subject_id = %subject_id, origin = %origin, "{message}");
        Ok(())
    }
}
