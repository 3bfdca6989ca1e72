//! Forum user lookup and provisioning.
//!
//! The [`UserStore`] resolves the current visitor to a [`ForumUser`] and
//! creates accounts for host-application users on first sight. Creation is
//! keyed on the host user id, so concurrent first requests for the same
//! host user end with exactly one record.

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{ForumUser, NewForumUser};

/// Who is making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Guest,
    /// Host-application user id.
    Host(i64),
    /// Forum user id, when the forum owns its identities.
    Member(Uuid),
}

/// Where forum identities come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSource {
    /// Forum accounts are derived from host-application users.
    Inherit,
    /// The forum keeps its own accounts.
    Own,
}

impl std::str::FromStr for UserSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inherit" => Ok(UserSource::Inherit),
            "own" => Ok(UserSource::Own),
            other => anyhow::bail!("unknown user source '{other}', expected 'inherit' or 'own'"),
        }
    }
}

/// Result of [`UserStore::create_inherited`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    /// This call created the record.
    Created(ForumUser),
    /// Another request created it first.
    Existing(ForumUser),
}

impl Provisioned {
    pub fn user(&self) -> &ForumUser {
        match self {
            Provisioned::Created(user) | Provisioned::Existing(user) => user,
        }
    }

    pub fn into_user(self) -> ForumUser {
        match self {
            Provisioned::Created(user) | Provisioned::Existing(user) => user,
        }
    }
}

/// Forum user persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Resolve the forum user behind an identity.
    async fn find_current(&self, identity: &Identity) -> Result<Option<ForumUser>> {
        match identity {
            Identity::Guest => Ok(None),
            Identity::Host(host_id) => self.find_by_host_id(*host_id).await,
            Identity::Member(id) => self.find_by_id(*id).await,
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ForumUser>>;

    async fn find_by_host_id(&self, host_id: i64) -> Result<Option<ForumUser>>;

    /// Number of forum accounts.
    async fn count(&self) -> Result<u64>;

    /// Persist a user derived from a host identity.
    ///
    /// Returns [`Provisioned::Existing`] when a record for the same host id
    /// already exists.
    async fn create_inherited(&self, new: NewForumUser) -> Result<Provisioned>;
}
