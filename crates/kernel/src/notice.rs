//! Flash notices.
//!
//! A notice is queued into the visitor's session and shown on the next page
//! render, after which it is cleared. Pending notices are compared by
//! [`NoticeKind`], never by their rendered text.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::routes::Route;

/// Session key holding the queued notices.
pub const SESSION_NOTICES: &str = "flash_notices";

/// Notice severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Success,
}

/// What a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The forum is in maintenance mode.
    Maintenance,
    /// The current account has no e-mail address.
    MissingEmail,
    /// The database schema is older than the running kernel.
    DatabaseUpgrade,
    /// The running kernel is older than the database schema.
    ModuleOutdated,
    /// A forum account was just created from the host identity.
    AccountCreated,
}

impl NoticeKind {
    pub fn severity(self) -> Severity {
        match self {
            NoticeKind::AccountCreated => Severity::Success,
            _ => Severity::Warning,
        }
    }

    /// Render the message text, with links to the named routes it mentions.
    pub fn message(self) -> String {
        match self {
            NoticeKind::Maintenance => format!(
                "The forum is currently in maintenance mode. All users without administrator \
                 privileges are redirected to {}. You can switch the mode off at {}.",
                link(Route::Maintenance, "Maintenance page"),
                link(Route::Settings, "Settings page"),
            ),
            NoticeKind::MissingEmail => format!(
                "No e-mail address has been set for your account! Go to {} to add one.",
                link(Route::ProfileDetails, "Profile > Account Details"),
            ),
            NoticeKind::DatabaseUpgrade => format!(
                "It looks like there is a new version of the forum database! {}",
                link(Route::LevelUp, "Update the forum"),
            ),
            NoticeKind::ModuleOutdated => {
                "Module version appears to be older than database! Please verify your database."
                    .to_string()
            }
            NoticeKind::AccountCreated => format!(
                "Hey! Your new forum account has just been automatically created! Go to {} to \
                 complement it.",
                link(Route::Profile, "Profile"),
            ),
        }
    }
}

fn link(route: Route, label: &str) -> String {
    format!("<a href=\"{}\">{label}</a>", route.path())
}

/// A queued notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub severity: Severity,
    pub message: String,
    /// Whether the notice closes itself after a short delay.
    pub autoclose: bool,
}

impl Notice {
    /// Build a notice of the given kind that stays until dismissed.
    pub fn sticky(kind: NoticeKind) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: kind.message(),
            autoclose: false,
        }
    }
}

/// Per-session notice queue.
#[async_trait]
pub trait NoticeChannel: Send + Sync {
    /// Kinds of the warning notices queued and not yet rendered, in queue order.
    async fn pending_warnings(&self) -> Result<Vec<NoticeKind>>;

    /// Append a notice.
    async fn queue(&self, notice: Notice) -> Result<()>;
}

/// Notice channel stored in the tower-sessions session.
#[derive(Clone)]
pub struct SessionNotices {
    session: Session,
}

impl SessionNotices {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    async fn load(&self) -> Result<Vec<Notice>> {
        let notices: Option<Vec<Notice>> = self
            .session
            .get(SESSION_NOTICES)
            .await
            .context("failed to read notices from session")?;
        Ok(notices.unwrap_or_default())
    }

    /// Remove and return every queued notice (used when rendering a page).
    pub async fn take(&self) -> Result<Vec<Notice>> {
        let notices: Option<Vec<Notice>> = self
            .session
            .remove(SESSION_NOTICES)
            .await
            .context("failed to drain notices from session")?;
        Ok(notices.unwrap_or_default())
    }
}

#[async_trait]
impl NoticeChannel for SessionNotices {
    async fn pending_warnings(&self) -> Result<Vec<NoticeKind>> {
        Ok(warning_kinds(&self.load().await?))
    }

    async fn queue(&self, notice: Notice) -> Result<()> {
        let mut notices = self.load().await?;
        notices.push(notice);
        self.session
            .insert(SESSION_NOTICES, notices)
            .await
            .context("failed to write notices to session")?;
        Ok(())
    }
}

/// In-process notice channel.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotices {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl MemoryNotices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything queued so far.
    pub fn all(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

#[async_trait]
impl NoticeChannel for MemoryNotices {
    async fn pending_warnings(&self) -> Result<Vec<NoticeKind>> {
        Ok(warning_kinds(&self.notices.lock()))
    }

    async fn queue(&self, notice: Notice) -> Result<()> {
        self.notices.lock().push(notice);
        Ok(())
    }
}

fn warning_kinds(notices: &[Notice]) -> Vec<NoticeKind> {
    notices
        .iter()
        .filter(|n| n.severity == Severity::Warning)
        .map(|n| n.kind)
        .collect()
}
