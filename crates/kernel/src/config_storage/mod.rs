//! Forum settings access.
//!
//! All reads of forum settings go through [`ConfigProvider`], so the gate
//! can be driven by the database-backed store in production and a fixed
//! map in tests.

mod direct;
mod memory;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

pub use direct::SiteConfigStore;
pub use memory::StaticConfig;

/// Setting names.
pub mod keys {
    /// `"1"` while the forum is in maintenance mode.
    pub const MAINTENANCE_MODE: &str = "maintenance_mode";
    /// Schema version the database was last upgraded to.
    pub const VERSION: &str = "version";
    /// Forum name.
    pub const NAME: &str = "name";
}

/// Value used for a setting that is not stored.
pub fn default_value(key: &str) -> Option<&'static str> {
    match key {
        keys::MAINTENANCE_MODE => Some("0"),
        keys::NAME => Some("Agora"),
        _ => None,
    }
}

/// Read-only view of the forum settings.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Get a setting, falling back to its default.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn maintenance_mode(&self) -> Result<bool> {
        Ok(self.get(keys::MAINTENANCE_MODE).await?.as_deref() == Some("1"))
    }

    /// Stored schema version, if any.
    async fn schema_version(&self) -> Result<Option<String>> {
        Ok(self
            .get(keys::VERSION)
            .await?
            .filter(|v| !v.trim().is_empty()))
    }
}

/// Settings that can also be changed, for the admin settings page and CLI.
#[async_trait]
pub trait ConfigStore: ConfigProvider {
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Every stored setting, defaults excluded.
    async fn all(&self) -> Result<HashMap<String, String>>;
}
