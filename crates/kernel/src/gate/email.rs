//! Missing e-mail check.

use super::{Gate, notify, pending_warnings};
use crate::models::ForumUser;
use crate::notice::{NoticeChannel, NoticeKind};

impl Gate {
    /// Warn a signed-in user whose account has no e-mail address.
    ///
    /// Advisory only: never redirects and never fails.
    pub async fn email_check(&self, user: Option<&ForumUser>, notices: &dyn NoticeChannel) {
        if pending_warnings(notices)
            .await
            .contains(&NoticeKind::MissingEmail)
        {
            return;
        }

        if user.is_some_and(ForumUser::lacks_email) {
            notify(notices, NoticeKind::MissingEmail).await;
        }
    }
}
