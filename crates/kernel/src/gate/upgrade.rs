//! Version skew check.

use std::cmp::Ordering;

use tracing::{debug, warn};

use super::{Gate, notify, pending_warnings};
use crate::notice::{NoticeChannel, NoticeKind};
use crate::version::Version;

impl Gate {
    /// Compare the running module version with the stored schema version.
    ///
    /// A newer module asks for a database upgrade; an older module asks the
    /// administrator to verify the database. Skipped while either notice is
    /// pending or when no schema version is stored. Advisory only.
    pub async fn upgrade_check(&self, notices: &dyn NoticeChannel) {
        let pending = pending_warnings(notices).await;
        if pending.contains(&NoticeKind::DatabaseUpgrade)
            || pending.contains(&NoticeKind::ModuleOutdated)
        {
            return;
        }

        let stored = match self.config.schema_version().await {
            Ok(Some(stored)) => Version::parse(&stored),
            Ok(None) => {
                debug!("no schema version stored, skipping version check");
                return;
            }
            Err(e) => {
                warn!(error = %e, "failed to read schema version");
                return;
            }
        };

        match self.module_version.cmp(&stored) {
            Ordering::Greater => notify(notices, NoticeKind::DatabaseUpgrade).await,
            Ordering::Less => notify(notices, NoticeKind::ModuleOutdated).await,
            Ordering::Equal => {}
        }
    }
}
