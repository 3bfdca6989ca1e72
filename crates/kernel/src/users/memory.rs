//! In-process user store.

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{Provisioned, UserStore};
use crate::models::{ForumUser, NewForumUser};

/// User store backed by a vector behind a mutex.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: Mutex<Vec<ForumUser>>,
    read_only: std::sync::atomic::AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record.
    pub fn insert(&self, user: ForumUser) {
        self.inner.users.lock().push(user);
    }

    /// Make every write fail, as a broken schema would.
    pub fn set_read_only(&self, read_only: bool) {
        self.inner
            .read_only
            .store(read_only, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.users.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ForumUser>> {
        Ok(self.inner.users.lock().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_host_id(&self, host_id: i64) -> Result<Option<ForumUser>> {
        Ok(self
            .inner
            .users
            .lock()
            .iter()
            .find(|u| u.inherited_id == Some(host_id))
            .cloned())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }

    async fn create_inherited(&self, new: NewForumUser) -> Result<Provisioned> {
        if self.inner.read_only.load(std::sync::atomic::Ordering::SeqCst) {
            bail!("user store is read-only");
        }

        // Check and insert under one lock so racing callers see one winner.
        let mut users = self.inner.users.lock();
        if let Some(existing) = users
            .iter()
            .find(|u| u.inherited_id.is_some() && u.inherited_id == new.inherited_id)
        {
            return Ok(Provisioned::Existing(existing.clone()));
        }

        let user = new.into_user();
        users.push(user.clone());
        Ok(Provisioned::Created(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::users::Identity;

    #[tokio::test]
    async fn second_creation_returns_existing() {
        let store = MemoryUserStore::new();

        let first = store
            .create_inherited(NewForumUser::inherited(5, "UTC"))
            .await
            .unwrap();
        let second = store
            .create_inherited(NewForumUser::inherited(5, "UTC"))
            .await
            .unwrap();

        assert!(matches!(first, Provisioned::Created(_)));
        assert!(matches!(second, Provisioned::Existing(_)));
        assert_eq!(first.user().id, second.user().id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_creation_yields_one_record() {
        let store = MemoryUserStore::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create_inherited(NewForumUser::inherited(99, "UTC"))
                    .await
                    .unwrap()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), Provisioned::Created(_)) {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn find_current_follows_identity() {
        let store = MemoryUserStore::new();
        let user = store
            .create_inherited(NewForumUser::inherited(3, "UTC"))
            .await
            .unwrap()
            .into_user();

        let by_host = store.find_current(&Identity::Host(3)).await.unwrap();
        let by_member = store.find_current(&Identity::Member(user.id)).await.unwrap();
        assert_eq!(by_host.as_ref(), Some(&user));
        assert_eq!(by_member.as_ref(), Some(&user));
        assert!(store.find_current(&Identity::Guest).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_only_store_rejects_writes() {
        let store = MemoryUserStore::new();
        store.set_read_only(true);
        assert!(
            store
                .create_inherited(NewForumUser::inherited(1, "UTC"))
                .await
                .is_err()
        );
        assert!(store.is_empty());
    }
}
