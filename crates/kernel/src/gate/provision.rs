//! Identity resolution and inherited account provisioning.

use tracing::{debug, error, info, warn};

use super::{Gate, GateError, GateOutcome, GateRequest, ResponseFormatter, Verdict, notify};
use crate::cache::CacheEvent;
use crate::models::{ForumUser, NewForumUser};
use crate::notice::{NoticeChannel, NoticeKind};
use crate::routes::Route;
use crate::users::{Identity, Provisioned, UserSource};

const PROVISION_ORIGIN: &str = "agora_kernel::gate::provision_inherited";

const MISCONFIGURED: &str = "There was an error while creating inherited user account. The forum \
                             can not run with the current configuration. Please contact \
                             administrator about this problem.";

/// Pages a banned user may still see. The maintenance page is included so
/// a banned user is not bounced between it and the ban page.
fn ban_exempt(action_id: &str) -> bool {
    action_id == Route::Ban.action_id() || action_id == Route::Maintenance.action_id()
}

impl Gate {
    /// Resolve the visitor to a forum user.
    ///
    /// In [`UserSource::Inherit`] mode a host user seen for the first time
    /// gets a forum account. The user's timezone, when set, becomes the
    /// response timezone.
    ///
    /// Banned users are redirected to the ban page in both user-source
    /// modes, not only for inherited identities. The ban and maintenance
    /// pages are let through: with maintenance on, the ban page itself
    /// redirects to the maintenance page.
    pub async fn init(&self, request: GateRequest<'_>) -> Result<GateOutcome, GateError> {
        let mut outcome = GateOutcome {
            verdict: Verdict::Continue,
            user: None,
            formatter: ResponseFormatter {
                timezone: self.default_timezone.clone(),
            },
        };

        let user = match (self.user_source, request.identity) {
            (_, Identity::Guest) => return Ok(outcome),
            (UserSource::Inherit, Identity::Host(host_id)) => {
                match self.users.find_by_host_id(host_id).await? {
                    Some(user) => Some(user),
                    None => Some(self.provision_inherited(host_id, request.notices).await?),
                }
            }
            (_, identity) => self.users.find_current(&identity).await?,
        };

        if let Some(user) = &user {
            if user.is_banned() && !ban_exempt(request.action_id) {
                debug!(user_id = %user.id, "banned user redirected");
                outcome.verdict = Verdict::Redirect(Route::Ban);
            }
            if let Some(timezone) = user.timezone() {
                outcome.formatter.timezone = timezone.to_string();
            }
        }

        outcome.user = user;
        Ok(outcome)
    }

    /// Create the forum account for a host user.
    ///
    /// Any failure is fatal for the request: the forum cannot serve inherited
    /// identities it cannot store.
    async fn provision_inherited(
        &self,
        host_id: i64,
        notices: &dyn NoticeChannel,
    ) -> Result<ForumUser, GateError> {
        let new = NewForumUser::inherited(host_id, self.default_timezone.as_str());
        if let Err(e) = new.validate() {
            error!(host_id, error = %e, "inherited account failed validation");
            return Err(GateError::Misconfigured(MISCONFIGURED.to_string()));
        }

        let provisioned = match self.users.create_inherited(new).await {
            Ok(provisioned) => provisioned,
            Err(e) => {
                error!(host_id, error = %e, "failed to store inherited account");
                return Err(GateError::Misconfigured(MISCONFIGURED.to_string()));
            }
        };

        let user = match provisioned {
            Provisioned::Created(user) => user,
            Provisioned::Existing(user) => {
                debug!(host_id, user_id = %user.id, "inherited account created concurrently");
                return Ok(user);
            }
        };

        notify(notices, NoticeKind::AccountCreated).await;
        self.cache.clear_after(CacheEvent::Activate).await;
        if let Err(e) = self
            .audit
            .info("Inherited account created", user.id, PROVISION_ORIGIN)
            .await
        {
            warn!(user_id = %user.id, error = %e, "failed to record account creation");
        }
        info!(host_id, user_id = %user.id, "inherited account created");

        Ok(user)
    }
}
