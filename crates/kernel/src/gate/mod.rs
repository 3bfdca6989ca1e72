//! Request gate.
//!
//! Runs before every forum action:
//!
//! 1. [`Gate::init`] resolves the visitor to a forum user, creating one for
//!    host-application users seen for the first time, and sends banned
//!    users to the ban page.
//! 2. [`Gate::before_action`] runs the maintenance, missing e-mail and
//!    version skew checks, in that order.
//!
//! A redirect from any step ends the request; later steps never run.

mod email;
mod maintenance;
mod provision;
mod upgrade;

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::cache::{CacheInvalidation, CacheLayer};
use crate::config_storage::ConfigProvider;
use crate::models::ForumUser;
use crate::notice::{Notice, NoticeChannel, NoticeKind};
use crate::permissions::Capabilities;
use crate::routes::Route;
use crate::services::{AuditLog, TracingAudit};
use crate::users::{Identity, UserSource, UserStore};
use crate::version::{MODULE_VERSION, Version};

/// Timezone used when neither the user nor the deployment sets one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Gate failures that stop the request.
#[derive(Debug, Error)]
pub enum GateError {
    /// The deployment cannot serve the forum, e.g. inherited accounts cannot
    /// be stored.
    #[error("forum misconfigured: {0}")]
    Misconfigured(String),

    #[error("gate collaborator failed")]
    Internal(#[from] anyhow::Error),
}

/// What happens to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Redirect(Route),
}

impl Verdict {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Verdict::Redirect(_))
    }
}

/// Per-request display settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFormatter {
    pub timezone: String,
}

/// The request as the gate sees it.
#[derive(Clone, Copy)]
pub struct GateRequest<'a> {
    pub identity: Identity,
    /// Last segment of the requested route, e.g. `"maintenance"`.
    pub action_id: &'a str,
    pub notices: &'a dyn NoticeChannel,
}

/// Result of running the gate.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub verdict: Verdict,
    pub user: Option<ForumUser>,
    pub formatter: ResponseFormatter,
}

/// The request gate and its collaborators.
#[derive(Clone)]
pub struct Gate {
    config: Arc<dyn ConfigProvider>,
    users: Arc<dyn UserStore>,
    capabilities: Arc<dyn Capabilities>,
    audit: Arc<dyn AuditLog>,
    cache: Arc<dyn CacheInvalidation>,
    user_source: UserSource,
    module_version: Version,
    default_timezone: String,
}

impl Gate {
    /// Create a gate deriving forum users from host identities.
    ///
    /// Audit entries go to tracing and cache invalidation to an in-process
    /// cache until replaced with [`Gate::with_audit`] and [`Gate::with_cache`].
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        users: Arc<dyn UserStore>,
        capabilities: Arc<dyn Capabilities>,
    ) -> Self {
        Self {
            config,
            users,
            capabilities,
            audit: Arc::new(TracingAudit),
            cache: Arc::new(CacheLayer::local()),
            user_source: UserSource::Inherit,
            module_version: Version::parse(MODULE_VERSION),
            default_timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheInvalidation>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_user_source(mut self, user_source: UserSource) -> Self {
        self.user_source = user_source;
        self
    }

    /// Override the compiled-in module version.
    pub fn with_module_version(mut self, version: &str) -> Self {
        self.module_version = Version::parse(version);
        self
    }

    pub fn with_default_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.default_timezone = timezone.into();
        self
    }

    pub fn user_source(&self) -> UserSource {
        self.user_source
    }

    pub fn module_version(&self) -> &Version {
        &self.module_version
    }

    pub fn config(&self) -> &Arc<dyn ConfigProvider> {
        &self.config
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    pub fn capabilities(&self) -> &Arc<dyn Capabilities> {
        &self.capabilities
    }

    /// Run the whole gate: [`Gate::init`], then [`Gate::before_action`]
    /// unless init redirected.
    pub async fn run(&self, request: GateRequest<'_>) -> Result<GateOutcome, GateError> {
        let mut outcome = self.init(request).await?;
        if outcome.verdict.is_redirect() {
            return Ok(outcome);
        }

        outcome.verdict = self.before_action(request, outcome.user.as_ref()).await?;
        Ok(outcome)
    }

    /// Maintenance, missing e-mail and version skew checks, in that order.
    pub async fn before_action(
        &self,
        request: GateRequest<'_>,
        user: Option<&ForumUser>,
    ) -> Result<Verdict, GateError> {
        let verdict = self
            .maintenance_check(request.action_id, user, request.notices)
            .await?;
        if verdict.is_redirect() {
            return Ok(verdict);
        }

        self.email_check(user, request.notices).await;
        self.upgrade_check(request.notices).await;

        Ok(Verdict::Continue)
    }
}

/// Pending warning kinds; a broken notice channel reads as empty.
async fn pending_warnings(notices: &dyn NoticeChannel) -> Vec<NoticeKind> {
    match notices.pending_warnings().await {
        Ok(pending) => pending,
        Err(e) => {
            warn!(error = %e, "failed to read pending notices");
            Vec::new()
        }
    }
}

/// Queue a notice that stays until dismissed. Failures are logged only.
async fn notify(notices: &dyn NoticeChannel, kind: NoticeKind) {
    if let Err(e) = notices.queue(Notice::sticky(kind)).await {
        warn!(error = %e, kind = ?kind, "failed to queue notice");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use crate::config_storage::{StaticConfig, keys};
    use crate::models::{NewForumUser, Role, UserStatus};
    use crate::notice::MemoryNotices;
    use crate::permissions::RoleCapabilities;
    use crate::users::MemoryUserStore;

    pub(crate) struct Fixture {
        pub config: StaticConfig,
        pub users: MemoryUserStore,
        pub notices: MemoryNotices,
        pub gate: Gate,
    }

    pub(crate) fn fixture(pairs: &[(&str, &str)], module_version: &str) -> Fixture {
        let config: StaticConfig = pairs.iter().copied().collect();
        let users = MemoryUserStore::new();
        let gate = Gate::new(
            Arc::new(config.clone()),
            Arc::new(users.clone()),
            Arc::new(RoleCapabilities),
        )
        .with_module_version(module_version);
        Fixture {
            config,
            users,
            notices: MemoryNotices::new(),
            gate,
        }
    }

    pub(crate) fn member(host_id: i64, role: Role, email: Option<&str>) -> ForumUser {
        let mut user = NewForumUser::inherited(host_id, "UTC").into_user();
        user.role = role;
        user.email = email.map(String::from);
        user
    }

    impl Fixture {
        pub(crate) fn request<'a>(&'a self, identity: Identity, action_id: &'a str) -> GateRequest<'a> {
            GateRequest {
                identity,
                action_id,
                notices: &self.notices,
            }
        }

        pub(crate) fn kinds(&self) -> Vec<NoticeKind> {
            self.notices.all().iter().map(|n| n.kind).collect()
        }
    }

    #[tokio::test]
    async fn maintenance_redirect_short_circuits_other_checks() {
        let fx = fixture(
            &[(keys::MAINTENANCE_MODE, "1"), (keys::VERSION, "1.5")],
            "1.5",
        );
        fx.users.insert(member(10, Role::Member, None));

        let outcome = fx
            .gate
            .run(fx.request(Identity::Host(10), "index"))
            .await
            .unwrap();

        assert_eq!(outcome.verdict, Verdict::Redirect(Route::Maintenance));
        assert_eq!(fx.kinds(), vec![NoticeKind::Maintenance]);
    }

    #[tokio::test]
    async fn admin_passes_with_outdated_database_notice() {
        let fx = fixture(
            &[(keys::MAINTENANCE_MODE, "0"), (keys::VERSION, "1.4")],
            "1.5",
        );
        fx.users
            .insert(member(1, Role::Admin, Some("admin@example.org")));

        let outcome = fx
            .gate
            .run(fx.request(Identity::Host(1), "index"))
            .await
            .unwrap();

        assert_eq!(outcome.verdict, Verdict::Continue);
        assert_eq!(fx.kinds(), vec![NoticeKind::DatabaseUpgrade]);
    }

    #[tokio::test]
    async fn banned_user_never_reaches_checks() {
        let fx = fixture(&[(keys::MAINTENANCE_MODE, "1"), (keys::VERSION, "0.1")], "1.0");
        let mut banned = member(4, Role::Member, None);
        banned.status = UserStatus::Banned;
        fx.users.insert(banned);

        let outcome = fx
            .gate
            .run(fx.request(Identity::Host(4), "index"))
            .await
            .unwrap();

        assert_eq!(outcome.verdict, Verdict::Redirect(Route::Ban));
        assert!(fx.notices.all().is_empty());
    }

    #[tokio::test]
    async fn guest_gets_only_global_notices() {
        let fx = fixture(&[(keys::VERSION, "2.0")], "1.0");

        let outcome = fx
            .gate
            .run(fx.request(Identity::Guest, "index"))
            .await
            .unwrap();

        assert_eq!(outcome.verdict, Verdict::Continue);
        assert!(outcome.user.is_none());
        assert_eq!(fx.kinds(), vec![NoticeKind::ModuleOutdated]);
        assert!(fx.users.is_empty());
    }

    #[tokio::test]
    async fn fresh_host_identity_is_provisioned_then_warned_about_email() {
        let fx = fixture(&[(keys::VERSION, "1.0")], "1.0");

        let outcome = fx
            .gate
            .run(fx.request(Identity::Host(77), "index"))
            .await
            .unwrap();

        assert_eq!(outcome.verdict, Verdict::Continue);
        let user = outcome.user.unwrap();
        assert_eq!(user.inherited_id, Some(77));
        assert_eq!(
            fx.kinds(),
            vec![NoticeKind::AccountCreated, NoticeKind::MissingEmail]
        );
    }

    #[tokio::test]
    async fn config_changes_are_seen_on_next_request() {
        let fx = fixture(&[(keys::VERSION, "1.0")], "1.0");

        let first = fx.gate.run(fx.request(Identity::Guest, "index")).await.unwrap();
        assert_eq!(first.verdict, Verdict::Continue);

        fx.config.insert(keys::MAINTENANCE_MODE, "1");
        let second = fx.gate.run(fx.request(Identity::Guest, "index")).await.unwrap();
        assert_eq!(second.verdict, Verdict::Redirect(Route::Maintenance));
    }
}
