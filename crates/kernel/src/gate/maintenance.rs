//! Maintenance mode check.

use tracing::debug;

use super::{Gate, GateError, Verdict, notify, pending_warnings};
use crate::models::ForumUser;
use crate::notice::{NoticeChannel, NoticeKind};
use crate::permissions::Capability;
use crate::routes::Route;

impl Gate {
    /// While maintenance mode is on, warn everyone and send everyone except
    /// administrators to the maintenance page.
    ///
    /// The maintenance page itself is always let through. The warning is
    /// queued once per pending set; administrators pass whether or not it
    /// was already pending.
    pub async fn maintenance_check(
        &self,
        action_id: &str,
        user: Option<&ForumUser>,
        notices: &dyn NoticeChannel,
    ) -> Result<Verdict, GateError> {
        if !self.config.maintenance_mode().await? {
            return Ok(Verdict::Continue);
        }

        if action_id == Route::Maintenance.action_id() {
            return Ok(Verdict::Continue);
        }

        if !pending_warnings(notices)
            .await
            .contains(&NoticeKind::Maintenance)
        {
            notify(notices, NoticeKind::Maintenance).await;
        }

        if self
            .capabilities
            .has(user, Capability::Administrator)
            .await?
        {
            debug!(action = %action_id, "administrator passes maintenance mode");
            return Ok(Verdict::Continue);
        }

        Ok(Verdict::Redirect(Route::Maintenance))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config_storage::keys;
    use crate::gate::tests::{fixture, member};
    use crate::models::Role;
    use crate::notice::Notice;

    #[tokio::test]
    async fn off_means_continue_without_notice() {
        let fx = fixture(&[(keys::MAINTENANCE_MODE, "0")], "1.0");
        let admin = member(1, Role::Admin, None);

        for user in [None, Some(&admin)] {
            for action in ["index", "maintenance", "settings"] {
                let verdict = fx
                    .gate
                    .maintenance_check(action, user, &fx.notices)
                    .await
                    .unwrap();
                assert_eq!(verdict, Verdict::Continue);
            }
        }
        assert!(fx.notices.all().is_empty());
    }

    #[tokio::test]
    async fn maintenance_page_is_never_redirected() {
        let fx = fixture(&[(keys::MAINTENANCE_MODE, "1")], "1.0");
        let verdict = fx
            .gate
            .maintenance_check("maintenance", None, &fx.notices)
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Continue);
        assert!(fx.notices.all().is_empty());
    }

    #[tokio::test]
    async fn non_admin_is_redirected_with_one_notice() {
        let fx = fixture(&[(keys::MAINTENANCE_MODE, "1")], "1.0");
        let user = member(2, Role::Member, None);

        let verdict = fx
            .gate
            .maintenance_check("index", Some(&user), &fx.notices)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Redirect(Route::Maintenance));
        let queued = fx.notices.all();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0], Notice::sticky(NoticeKind::Maintenance));
        assert!(!queued[0].autoclose);
    }

    #[tokio::test]
    async fn repeated_checks_queue_a_single_notice() {
        let fx = fixture(&[(keys::MAINTENANCE_MODE, "1")], "1.0");

        for _ in 0..2 {
            let verdict = fx
                .gate
                .maintenance_check("index", None, &fx.notices)
                .await
                .unwrap();
            assert_eq!(verdict, Verdict::Redirect(Route::Maintenance));
        }
        assert_eq!(fx.notices.all().len(), 1);
    }

    #[tokio::test]
    async fn admin_passes_and_is_warned_once() {
        let fx = fixture(&[(keys::MAINTENANCE_MODE, "1")], "1.0");
        let admin = member(1, Role::Admin, None);

        for _ in 0..2 {
            let verdict = fx
                .gate
                .maintenance_check("index", Some(&admin), &fx.notices)
                .await
                .unwrap();
            assert_eq!(verdict, Verdict::Continue);
        }
        assert_eq!(fx.notices.all().len(), 1);
    }
}
